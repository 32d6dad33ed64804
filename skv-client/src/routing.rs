//! # Key Routing
//!
//! Strategy objects that decide where a command may go, based only on its
//! keys. The standalone client accepts any key set; the cluster client
//! requires every key of a call to hash to one slot and rejects the call
//! locally otherwise.

use skv_common::common_slot;

use crate::error::ClientResult;

/// Destination of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Any node can serve it (standalone, or keyless commands).
    Any,
    /// The node owning this hash slot must serve it.
    Slot(u16),
}

/// Decides the route for a command's keys.
pub trait RoutingPolicy: Send + Sync {
    fn route(&self, keys: &[&[u8]]) -> ClientResult<Route>;
}

/// Single-node routing: no key constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleNode;

impl RoutingPolicy for SingleNode {
    #[inline]
    fn route(&self, _keys: &[&[u8]]) -> ClientResult<Route> {
        Ok(Route::Any)
    }
}

/// Slot routing: all keys must share a hash slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotRouting;

impl RoutingPolicy for SlotRouting {
    fn route(&self, keys: &[&[u8]]) -> ClientResult<Route> {
        Ok(match common_slot(keys)? {
            Some(slot) => Route::Slot(slot),
            None => Route::Any,
        })
    }
}
