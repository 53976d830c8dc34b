//! Transport and connection configuration.
//!
//! Both structs deserialize with every field optional; missing fields fall
//! back to the [`Default`] values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where and how to open the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote port.
    pub port: u16,
    /// Time allowed for the transport connect.
    pub connect_timeout: Duration,
}

impl TransportConfig {
    /// Create a config for `host:port` with the default connect timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    /// `host:port` string suitable for a socket connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 443,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Session parameters applied to a connection after it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Previously negotiated authorization key, if any.
    pub auth_key: Option<Vec<u8>>,
    /// Server salt for the current session.
    pub salt: u64,
    /// Session id to resume, if any.
    pub session_id: Option<u64>,
    /// Time allowed for each RPC response.
    pub default_response_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            auth_key: None,
            salt: 0,
            session_id: None,
            default_response_timeout: Duration::from_secs(30),
        }
    }
}
