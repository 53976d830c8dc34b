//! Response values returned by the server.

use serde::{Deserialize, Serialize};

/// Server configuration returned by the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server time when the config was produced (unix seconds).
    pub date: i32,
    /// Time after which the config should be refreshed (unix seconds).
    pub expires: i32,
    /// Whether the server is a test deployment.
    pub test_mode: bool,
    /// Data center the connection landed on.
    pub this_dc: i32,
    /// Known data center endpoints.
    pub dc_options: Vec<DcOption>,
    /// Maximum members in a basic group.
    pub chat_size_max: i32,
}

/// One data center endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcOption {
    /// Data center id.
    pub id: i32,
    /// Host name.
    pub hostname: String,
    /// IP address.
    pub ip_address: String,
    /// TCP port.
    pub port: u16,
}

/// A server reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Server configuration.
    Config(ServerConfig),
    /// Plain boolean result.
    Bool(bool),
    /// Remote error.
    Error {
        /// Numeric error code.
        code: i32,
        /// Error message, e.g. `CONNECTION_NOT_INITED`.
        message: String,
    },
}

impl Response {
    /// Variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Bool(_) => "bool",
            Self::Error { .. } => "error",
        }
    }

    /// Unwrap a config response.
    pub fn into_config(self) -> Option<ServerConfig> {
        match self {
            Self::Config(config) => Some(config),
            _ => None,
        }
    }
}
