//! Collaborator contracts for the mtlink client.
//!
//! The client facade orchestrates, it does not do I/O. Everything that
//! touches the network sits behind the traits in this crate:
//!
//! - [`connection`]: transport-backed connection (connect, disconnect, state)
//! - [`invoker`]: RPC round trips and their response timeout
//! - [`builder`]: construction of a connection from a transport config
//! - [`config`]: transport and connection configuration
//! - [`error`]: transport and RPC error types
//!
//! Production transports and the simulation harness both implement these
//! traits, so the same client code runs against either.

pub mod builder;
pub mod config;
pub mod connection;
pub mod error;
pub mod invoker;

pub use builder::ConnectionBuilder;
pub use config::{ConnectionConfig, TransportConfig};
pub use connection::{ClientConnection, ClientTransportState, TransportConnectResult};
pub use error::{RpcError, TransportError};
pub use invoker::RpcInvoker;
