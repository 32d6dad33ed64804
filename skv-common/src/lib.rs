// skv-common - Shared result, option, and routing types for SlotKV
//
// Nothing in this crate touches the network; the client crate builds its
// command surface on top of these types.

pub mod error;
pub mod lcs;
pub mod nilable;
pub mod options;
pub mod slot;

// Re-export for convenience
pub use error::*;
pub use lcs::*;
pub use nilable::*;
pub use options::*;
pub use slot::*;
