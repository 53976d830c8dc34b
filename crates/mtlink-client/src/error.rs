//! Client error types.

use std::{fmt, time::Duration};

use mtlink_core::{RpcError, TransportError};
use mtlink_proto::ProtocolError;
use thiserror::Error;

/// Which step of a connect ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Transport connect.
    Connect,
    /// Layer/init/config handshake call.
    Handshake,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("transport connect"),
            Self::Handshake => f.write_str("handshake"),
        }
    }
}

/// Errors returned by [`crate::Client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation invoked after disposal began. Build a new client.
    #[error("client was disposed")]
    Disposed,

    /// Handshake response was not a server config.
    #[error("handshake expected a server config, got {got}")]
    HandshakeProtocol {
        /// Kind of response actually received.
        got: &'static str,
    },

    /// A call returned a response of the wrong shape.
    #[error("{method} returned unexpected {got} response")]
    UnexpectedResponse {
        /// Method that was called.
        method: &'static str,
        /// Kind of response actually received.
        got: &'static str,
    },

    /// Connect or handshake exceeded its configured duration.
    #[error("{phase} timed out after {after:?}")]
    Timeout {
        /// Step that timed out.
        phase: Phase,
        /// Configured limit.
        after: Duration,
    },

    /// Operation needs a connected transport.
    #[error("transport is not connected")]
    NotConnected,

    /// No handshake has completed, so no other call may be sent.
    #[error("handshake has not completed on this connection")]
    HandshakeRequired,

    /// Application info failed validation.
    #[error("invalid application info: {0}")]
    InvalidAppInfo(#[from] ProtocolError),

    /// Transport failure, unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// RPC failure, unchanged.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl ClientError {
    /// Whether this is [`ClientError::Disposed`].
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}
