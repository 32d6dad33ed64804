//! # Standalone Client
//!
//! Purpose: Expose the blocking command surface against a single server.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `StandaloneClient` hides pooling and protocol details.
//! 2. **Strategy Pattern**: Routing is delegated to `SingleNode`, which puts
//!    no constraint on the keys of a call.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.

use crate::commands::{
    rotation_password, CommandExecutor, ConnectionManagement, GenericCommands, StringCommands,
};
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::pool::{ClientStatistics, ConnectionPool, PoolConfig};
use crate::resp::RespValue;
use crate::routing::{Route, RoutingPolicy, SingleNode};

/// Client for a single, non-clustered server.
///
/// Each call acquires a connection, executes one command, and returns the
/// connection to the pool. The client is `Send + Sync`; share it by reference
/// or wrap it in an `Arc`.
pub struct StandaloneClient {
    pool: ConnectionPool,
    routing: SingleNode,
}

impl StandaloneClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            connect_timeout: config.connect_timeout,
            username: config.username,
            password: config.password,
            database: config.database,
        })?;
        Ok(StandaloneClient {
            pool,
            routing: SingleNode,
        })
    }

    /// Connection counters of the single pool.
    pub fn get_statistics(&self) -> ClientStatistics {
        let mut stats = ClientStatistics::default();
        stats
            .nodes
            .insert(self.pool.addr().to_string(), self.pool.stats());
        stats
    }
}

impl CommandExecutor for StandaloneClient {
    fn route(&self, keys: &[&[u8]]) -> ClientResult<Route> {
        self.routing.route(keys)
    }

    fn execute(&self, _route: Route, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut conn = self.pool.acquire()?;
        conn.exec(args)
    }
}

impl StringCommands for StandaloneClient {}

impl GenericCommands for StandaloneClient {}

impl ConnectionManagement for StandaloneClient {
    fn update_connection_password(
        &self,
        password: Option<&str>,
        immediate_auth: bool,
    ) -> ClientResult<String> {
        let password = rotation_password(password, immediate_auth)?;
        self.pool.set_password(password);
        if immediate_auth {
            self.pool.reauthenticate()?;
        }
        Ok("OK".to_string())
    }
}
