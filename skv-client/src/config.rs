//! # Client Configuration
//!
//! Plain config structs for both client variants. They deserialize from JSON
//! with every field optional; timeouts are written as milliseconds:
//!
//! ```json
//! { "addr": "127.0.0.1:6379", "max_total": 32, "read_timeout_ms": 250, "password": "secret" }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

/// Configuration for the standalone client and its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    #[serde(rename = "write_timeout_ms", with = "duration_ms")]
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Option<Duration>,
    /// ACL username; `None` authenticates as the default user.
    pub username: Option<String>,
    /// Password sent with AUTH on every new connection.
    pub password: Option<String>,
    /// Database selected on every new connection.
    pub database: Option<i64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            username: None,
            password: None,
            database: None,
        }
    }
}

/// Configuration for the cluster client.
///
/// Pool limits and timeouts apply to each node's pool separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Seed node addresses; commands with no known slot owner go to the first.
    pub nodes: Vec<String>,
    /// Maximum idle connections per node.
    pub max_idle: usize,
    /// Maximum total connections per node.
    pub max_total: usize,
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Option<Duration>,
    #[serde(rename = "write_timeout_ms", with = "duration_ms")]
    pub write_timeout: Option<Duration>,
    #[serde(rename = "connect_timeout_ms", with = "duration_ms")]
    pub connect_timeout: Option<Duration>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// MOVED/ASK redirects followed per command before giving up.
    pub max_redirects: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            nodes: vec!["127.0.0.1:7000".to_string()],
            max_idle: 4,
            max_total: 8,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            username: None,
            password: None,
            max_redirects: 5,
        }
    }
}

macro_rules! impl_json_loading {
    ($ty:ty) => {
        impl $ty {
            /// Parses the config from a JSON document.
            pub fn from_json_str(input: &str) -> ClientResult<Self> {
                Ok(serde_json::from_str(input)?)
            }

            /// Reads and parses a JSON config file.
            pub fn from_json_file(path: impl AsRef<Path>) -> ClientResult<Self> {
                let raw = std::fs::read_to_string(path)?;
                Self::from_json_str(&raw)
            }
        }
    };
}

impl_json_loading!(ClientConfig);
impl_json_loading!(ClusterConfig);

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => ser.serialize_some(&(duration.as_millis() as u64)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(de)?.map(Duration::from_millis))
    }
}
