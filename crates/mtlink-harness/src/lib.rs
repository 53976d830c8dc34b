//! Test doubles for the mtlink client.
//!
//! - [`ScriptedConnection`]: in-memory connection whose connect, reply and
//!   disconnect behavior is scripted up front, with a shared [`CallLog`]
//! - [`SimConnection`]: real framed TCP connection over turmoil's simulated
//!   network
//! - [`SimServer`]: simulated server that enforces the layer/init handshake
//!   and answers config requests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scripted;
pub mod sim_server;
pub mod sim_transport;
pub mod wire;

pub use scripted::{Call, CallLog, ConnectOutcome, Reply, ScriptedBuilder, ScriptedConnection};
pub use sim_server::SimServer;
pub use sim_transport::{SimConnection, SimConnectionBuilder};

use mtlink_proto::{DcOption, ServerConfig};

/// Fixed server config used as the default handshake reply.
pub fn sample_config() -> ServerConfig {
    ServerConfig {
        date: 1_700_000_000,
        expires: 1_700_003_600,
        test_mode: true,
        this_dc: 2,
        dc_options: vec![DcOption {
            id: 2,
            hostname: "dc2.sim".to_string(),
            ip_address: "10.0.0.2".to_string(),
            port: 443,
        }],
        chat_size_max: 200,
    }
}
