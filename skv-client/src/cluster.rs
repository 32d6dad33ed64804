//! # Cluster Client
//!
//! Purpose: Expose the same command surface as `StandaloneClient` against a
//! sharded cluster, sending each command to the node that owns its slot.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `SlotRouting` validates keys; a call whose keys
//!    span slots fails before any I/O.
//! 2. **Learn From Redirects**: Slot owners are learned from `MOVED` replies
//!    and cached; there is no topology crawling.
//! 3. **Lazy Pools**: One connection pool per node, created on first use.
//! 4. **Bounded Redirects**: A command follows at most `max_redirects`
//!    `MOVED`/`ASK` replies.
//!
//! ## Request Flow
//!
//! ```text
//! keys ──► SlotRouting ──► Route::Slot(s)
//!                              │
//!              slot table hit? ├─ yes ─► owner pool
//!                              └─ no ──► first seed pool
//!                                             │
//!            -MOVED s host:port ◄─────────────┤ cache owner, resend
//!            -ASK s host:port   ◄─────────────┤ ASKING + resend, no cache
//!            anything else      ◄─────────────┘ decoded by caller
//! ```

use std::collections::HashMap;

use parking_lot::RwLock;
use skv_common::SkvError;
use tracing::{debug, warn};

use crate::commands::{
    rotation_password, CommandExecutor, ConnectionManagement, GenericCommands, StringCommands,
};
use crate::config::ClusterConfig;
use crate::error::{ClientError, ClientResult};
use crate::pool::{ClientStatistics, ConnectionPool, PoolConfig};
use crate::resp::RespValue;
use crate::routing::{Route, RoutingPolicy, SlotRouting};

/// Redirect carried by a cluster error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// The slot has moved for good; update the slot table.
    Moved { slot: u16, addr: String },
    /// One-off redirect during slot migration.
    Ask { slot: u16, addr: String },
}

/// Parses `MOVED <slot> <host:port>` / `ASK <slot> <host:port>` error text.
pub fn parse_redirect(message: &[u8]) -> Option<Redirect> {
    let text = std::str::from_utf8(message).ok()?;
    let mut parts = text.split_ascii_whitespace();
    let kind = parts.next()?;
    let slot = parts.next()?.parse::<u16>().ok()?;
    let addr = parts.next()?.to_string();
    if parts.next().is_some() || !addr.contains(':') {
        return None;
    }
    match kind {
        "MOVED" => Some(Redirect::Moved { slot, addr }),
        "ASK" => Some(Redirect::Ask { slot, addr }),
        _ => None,
    }
}

/// Client for a sharded cluster.
pub struct ClusterClient {
    config: ClusterConfig,
    routing: SlotRouting,
    password: RwLock<Option<String>>,
    pools: RwLock<HashMap<String, ConnectionPool>>,
    slots: RwLock<HashMap<u16, String>>,
}

impl ClusterClient {
    /// Creates a client from seed addresses with default settings.
    pub fn connect<I, S>(nodes: I) -> ClientResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = ClusterConfig {
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..ClusterConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration. No connection is opened
    /// until the first command.
    pub fn with_config(config: ClusterConfig) -> ClientResult<Self> {
        if config.nodes.is_empty() {
            return Err(SkvError::InvalidArgument("cluster config has no seed nodes".into()).into());
        }
        let password = RwLock::new(config.password.clone());
        Ok(ClusterClient {
            config,
            routing: SlotRouting,
            password,
            pools: RwLock::new(HashMap::new()),
            slots: RwLock::new(HashMap::new()),
        })
    }

    /// Node currently known to own `slot`, if a redirect has taught us.
    pub fn slot_owner(&self, slot: u16) -> Option<String> {
        self.slots.read().get(&slot).cloned()
    }

    /// Connection counters of every node pool opened so far.
    pub fn get_statistics(&self) -> ClientStatistics {
        let nodes = self
            .pools
            .read()
            .iter()
            .map(|(addr, pool)| (addr.clone(), pool.stats()))
            .collect();
        ClientStatistics { nodes }
    }

    fn seed(&self) -> &str {
        // Non-empty, checked in `with_config`.
        &self.config.nodes[0]
    }

    fn target_for(&self, route: Route) -> String {
        match route {
            Route::Slot(slot) => self
                .slot_owner(slot)
                .unwrap_or_else(|| self.seed().to_string()),
            Route::Any => self.seed().to_string(),
        }
    }

    fn pool_for(&self, addr: &str) -> ClientResult<ConnectionPool> {
        if let Some(pool) = self.pools.read().get(addr) {
            return Ok(pool.clone());
        }
        let mut pools = self.pools.write();
        if let Some(pool) = pools.get(addr) {
            return Ok(pool.clone());
        }
        let pool = ConnectionPool::new(PoolConfig {
            addr: addr.to_string(),
            max_idle: self.config.max_idle,
            max_total: self.config.max_total,
            read_timeout: self.config.read_timeout,
            write_timeout: self.config.write_timeout,
            connect_timeout: self.config.connect_timeout,
            username: self.config.username.clone(),
            password: self.password.read().clone(),
            database: None,
        })?;
        debug!(addr = %pool.addr(), "created node pool");
        pools.insert(addr.to_string(), pool.clone());
        Ok(pool)
    }

    fn send(&self, addr: &str, asking: bool, args: &[&[u8]]) -> ClientResult<RespValue> {
        let pool = self.pool_for(addr)?;
        let mut conn = pool.acquire()?;
        if asking {
            match conn.exec(&[b"ASKING"])? {
                RespValue::Simple(_) => {}
                RespValue::Error(message) => return Err(ClientError::Server { message }),
                _ => return Err(ClientError::UnexpectedResponse),
            }
        }
        conn.exec(args)
    }
}

/// Resolves a redirect target; `:port` means "same host as the current node".
fn redirect_target(current: &str, addr: String) -> String {
    if !addr.starts_with(':') {
        return addr;
    }
    match current.rsplit_once(':') {
        Some((host, _)) => format!("{host}{addr}"),
        None => addr,
    }
}

impl CommandExecutor for ClusterClient {
    fn route(&self, keys: &[&[u8]]) -> ClientResult<Route> {
        self.routing.route(keys)
    }

    fn execute(&self, route: Route, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut target = self.target_for(route);
        let mut asking = false;

        for _ in 0..=self.config.max_redirects {
            let resp = self.send(&target, asking, args)?;
            let redirect = match &resp {
                RespValue::Error(message) => parse_redirect(message),
                _ => None,
            };
            match redirect {
                Some(Redirect::Moved { slot, addr }) => {
                    let addr = redirect_target(&target, addr);
                    debug!(slot, owner = %addr, "slot moved");
                    self.slots.write().insert(slot, addr.clone());
                    target = addr;
                    asking = false;
                }
                Some(Redirect::Ask { slot, addr }) => {
                    let addr = redirect_target(&target, addr);
                    debug!(slot, node = %addr, "asking redirect");
                    target = addr;
                    asking = true;
                }
                None => return Ok(resp),
            }
        }

        let slot = match route {
            Route::Slot(slot) => slot,
            Route::Any => 0,
        };
        warn!(slot, limit = self.config.max_redirects, "redirect limit reached");
        Err(ClientError::TooManyRedirects { slot })
    }
}

impl StringCommands for ClusterClient {}

impl GenericCommands for ClusterClient {}

impl ConnectionManagement for ClusterClient {
    fn update_connection_password(
        &self,
        password: Option<&str>,
        immediate_auth: bool,
    ) -> ClientResult<String> {
        let password = rotation_password(password, immediate_auth)?;
        *self.password.write() = password.clone();

        let pools: Vec<ConnectionPool> = self.pools.read().values().cloned().collect();
        for pool in &pools {
            pool.set_password(password.clone());
        }

        if immediate_auth {
            let pools = if pools.is_empty() {
                vec![self.pool_for(self.seed())?]
            } else {
                pools
            };
            let mut first_err = None;
            for pool in &pools {
                if let Err(err) = pool.reauthenticate() {
                    first_err.get_or_insert(err);
                }
            }
            if let Some(err) = first_err {
                return Err(err);
            }
        }
        Ok("OK".to_string())
    }
}
