//! Transport-backed connection contract.
//!
//! A connection owns the byte-level transport and the RPC session running
//! over it. The client facade drives it through this trait:
//!
//! ```text
//!                 connect()                 disconnect()
//! ┌──────────────┐ ────────> ┌────────────┐ ──────────> ┌───────────────┐
//! │ Disconnected │           │ Connecting │             │ Disconnecting │
//! └──────────────┘ <──────── └────────────┘             └───────────────┘
//!        ▲          failure        │ success                    │
//!        │                         ▼                            │
//!        │                   ┌───────────┐  disconnect()        │
//!        │                   │ Connected │ ─────────────────────┘
//!        └───────────────────└───────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{config::ConnectionConfig, error::TransportError, invoker::RpcInvoker};

/// Outcome of a transport connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportConnectResult {
    /// Transport is connected.
    Success,
    /// Another connect attempt is already in flight.
    AlreadyConnecting,
    /// Remote refused or was unreachable.
    Failed,
}

impl TransportConnectResult {
    /// Whether the transport ended up connected.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Observable transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientTransportState {
    /// No transport open.
    #[default]
    Disconnected,
    /// Connect in flight.
    Connecting,
    /// Transport open.
    Connected,
    /// Disconnect in flight.
    Disconnecting,
}

/// A transport-backed RPC connection.
///
/// Implementations use interior mutability; every method takes `&self` so the
/// client can share the connection with in-flight calls.
#[async_trait]
pub trait ClientConnection: RpcInvoker + Send + Sync + 'static {
    /// Open the transport.
    ///
    /// Connection refusal is reported as [`TransportConnectResult::Failed`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns a transport error on unexpected I/O failures.
    async fn connect(&self) -> Result<TransportConnectResult, TransportError>;

    /// Close the transport.
    ///
    /// Must succeed on an already disconnected transport.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the shutdown itself fails.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Whether the transport is open.
    fn is_connected(&self) -> bool;

    /// Current transport state.
    fn state(&self) -> ClientTransportState;

    /// Subscribe to transport state changes.
    fn state_changes(&self) -> watch::Receiver<ClientTransportState>;

    /// Time allowed for [`ClientConnection::connect`].
    fn connect_timeout(&self) -> Duration;

    /// Change the time allowed for [`ClientConnection::connect`].
    fn set_connect_timeout(&self, timeout: Duration);

    /// Apply session parameters.
    fn configure(&self, config: &ConnectionConfig);

    /// Release transport resources. Called once, after the final disconnect.
    fn close(&self);
}
