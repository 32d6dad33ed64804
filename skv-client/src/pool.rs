//! # Connection Pool
//!
//! Purpose: Reuse authenticated TCP connections so a command costs one round
//! trip, not a handshake plus AUTH plus SELECT.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Fail Fast**: Exceeding the pool limit returns an error immediately.
//! 4. **Credentials at Connect**: New connections authenticate with whatever
//!    password is current at that moment, so rotation needs no reconnect.

use std::collections::{BTreeMap, VecDeque};
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::resp::{encode_command, read_response, RespValue};

/// Pool configuration, shared by both client variants.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// ACL username sent with AUTH.
    pub username: Option<String>,
    /// Initial password; replaced at runtime through `set_password`.
    pub password: Option<String>,
    /// Database selected after connecting.
    pub database: Option<i64>,
}

/// Connection counters of one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Open connections, idle plus checked out.
    pub total: usize,
    /// Connections waiting in the pool.
    pub idle: usize,
}

/// Per-node pool counters of a client, keyed by node address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientStatistics {
    pub nodes: BTreeMap<String, PoolStats>,
}

impl ClientStatistics {
    pub fn total_connections(&self) -> usize {
        self.nodes.values().map(|stats| stats.total).sum()
    }

    pub fn idle_connections(&self) -> usize {
        self.nodes.values().map(|stats| stats.idle).sum()
    }
}

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

struct PoolInner {
    config: PoolConfig,
    password: RwLock<Option<String>>,
    state: Mutex<PoolState>,
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool. No connection is opened until first use.
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        let password = RwLock::new(config.password.clone());
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                password,
                state: Mutex::new(state),
            }),
        })
    }

    /// Address this pool connects to.
    pub fn addr(&self) -> &str {
        &self.inner.config.addr
    }

    /// Snapshot of the connection counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            total: state.total,
            idle: state.idle.len(),
        }
    }

    /// Acquires a connection from the pool.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        if let Some(conn) = self.pop_idle() {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }

        if !self.try_reserve() {
            return Err(ClientError::PoolExhausted);
        }

        let password = self.inner.password.read().clone();
        match Connection::connect(&self.inner.config, password.as_deref()) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.release_slot();
                Err(err)
            }
        }
    }

    /// Replaces the password used by connections opened from now on.
    pub fn set_password(&self, password: Option<String>) {
        *self.inner.password.write() = password;
    }

    /// Re-sends AUTH with the current password on every idle connection.
    ///
    /// With no idle connection, one is opened instead so the new password is
    /// still checked against the server. Connections that fail at the
    /// transport level are dropped; the first error is returned after all
    /// connections are handled.
    pub fn reauthenticate(&self) -> ClientResult<()> {
        let password = self.inner.password.read().clone();
        let Some(password) = password else {
            return Ok(());
        };

        let idle: Vec<Connection> = {
            let mut state = self.inner.state.lock();
            state.idle.drain(..).collect()
        };
        debug!(addr = %self.inner.config.addr, count = idle.len(), "re-authenticating idle connections");
        if idle.is_empty() {
            return match self.acquire() {
                // Every connection is checked out; they keep their session.
                Ok(_) | Err(ClientError::PoolExhausted) => Ok(()),
                Err(err) => Err(err),
            };
        }

        let mut first_err = None;
        for mut conn in idle {
            match conn.auth(self.inner.config.username.as_deref(), &password) {
                Ok(()) => self.return_connection(conn),
                Err(err) => {
                    if err.poisons_connection() {
                        self.release_slot();
                    } else {
                        self.return_connection(conn);
                    }
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn pop_idle(&self) -> Option<Connection> {
        self.inner.state.lock().idle.pop_front()
    }

    fn try_reserve(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.total >= self.inner.config.max_total {
            return false;
        }
        state.total += 1;
        true
    }

    fn release_slot(&self) {
        let mut state = self.inner.state.lock();
        state.total = state.total.saturating_sub(1);
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.inner.state.lock();
        if state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Executes a RESP command and returns the parsed reply.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(ClientError::Protocol);
        };
        let response = conn.exec(args);
        if let Err(err) = &response {
            // A half-read reply leaves the stream unusable.
            if err.poisons_connection() {
                self.valid = false;
            }
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        let pool = ConnectionPool {
            inner: self.pool.clone(),
        };

        if self.valid {
            pool.return_connection(conn);
        } else {
            debug!(addr = %self.pool.config.addr, "discarding broken connection");
            pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: BytesMut,
}

impl Connection {
    fn connect(config: &PoolConfig, password: Option<&str>) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: BytesMut::with_capacity(256),
        };
        debug!(addr = %config.addr, "connection established");

        if let Some(password) = password {
            conn.auth(config.username.as_deref(), password)?;
        }
        if let Some(db) = config.database {
            let db = db.to_string();
            conn.expect_ok(&[b"SELECT", db.as_bytes()])?;
        }
        Ok(conn)
    }

    fn auth(&mut self, username: Option<&str>, password: &str) -> ClientResult<()> {
        match username {
            Some(user) => self.expect_ok(&[b"AUTH", user.as_bytes(), password.as_bytes()])?,
            None => self.expect_ok(&[b"AUTH", password.as_bytes()])?,
        }
        debug!("connection authenticated");
        Ok(())
    }

    fn expect_ok(&mut self, args: &[&[u8]]) -> ClientResult<()> {
        match self.exec(args)? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(config: &PoolConfig) -> ClientResult<TcpStream> {
    let addr = resolve(&config.addr)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
        None => TcpStream::connect(addr)?,
    };
    Ok(stream)
}

fn resolve(addr: &str) -> ClientResult<SocketAddr> {
    if let Ok(parsed) = addr.parse() {
        return Ok(parsed);
    }
    // Host names ("localhost:6379") go through the resolver.
    addr.to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(addr.to_string()))?
        .next()
        .ok_or_else(|| ClientError::InvalidAddress(addr.to_string()))
}
