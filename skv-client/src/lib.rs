//! # SlotKV Sync Client
//!
//! Purpose: Provide a blocking client for a Redis-compatible key-value
//! service, usable against a single server or a sharded cluster through the
//! same typed command surface.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse authenticated TCP connections per node.
//! 2. **Template Method**: Commands are written once on `CommandExecutor`;
//!    each client variant supplies only routing and execution.
//! 3. **Explicit Absence**: Replies that may be nil come back as `Nilable`.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.
//!
//! ```no_run
//! use skv_client::{StandaloneClient, StringCommands};
//!
//! let client = StandaloneClient::connect("127.0.0.1:6379")?;
//! client.set(b"greeting", b"hello")?;
//! let value = client.get(b"greeting")?;
//! assert_eq!(value.value()?, b"hello");
//! # Ok::<(), skv_client::ClientError>(())
//! ```

mod client;
mod cluster;
mod commands;
mod config;
mod error;
mod pool;
mod reply;
mod resp;
mod routing;

pub use client::StandaloneClient;
pub use cluster::{parse_redirect, ClusterClient, Redirect};
pub use commands::{
    CommandExecutor, ConnectionManagement, GenericCommands, KeyTtl, StringCommands,
};
pub use config::{ClientConfig, ClusterConfig};
pub use error::{ClientError, ClientResult};
pub use pool::{ClientStatistics, PoolStats};
pub use resp::RespValue;
pub use routing::{Route, RoutingPolicy, SingleNode, SlotRouting};

pub use skv_common::{
    hash_slot, Expiry, GetExOptions, LcsIdxOptions, LcsIdxReport, LcsMatch, Nilable,
    SetCondition, SetOptions, SkvError, SkvResult,
};
