//! Session-lifecycle facade for the mtlink RPC client.
//!
//! [`Client`] owns one transport-backed connection and sequences everything
//! that happens to it:
//!
//! ```text
//! connect() ──> transport connect ──> handshake (layer/init/config) ──> Success
//!                     │ failure                  │ error
//!                     ▼                          ▼
//!              result returned            error returned, config absent
//! ```
//!
//! # Components
//!
//! - [`Client`]: the public facade (connect, disconnect, dispose, accessors)
//! - [`handshake`]: builds and runs the mandatory first call
//! - [`lifecycle`]: disposal guard checked by every operation
//! - [`Methods`]: calls issued after the handshake
//! - [`ClientError`]: everything the facade can fail with

mod client;
mod error;
pub mod handshake;
pub mod lifecycle;
mod methods;

pub use client::Client;
pub use error::{ClientError, Phase};
pub use lifecycle::LifecycleState;
pub use methods::Methods;
pub use mtlink_core::{
    ClientConnection, ClientTransportState, ConnectionBuilder, ConnectionConfig, RpcInvoker,
    TransportConfig, TransportConnectResult,
};
pub use mtlink_proto::{ClientAppInfo, ServerConfig};
