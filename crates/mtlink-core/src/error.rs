//! Error types for transport and RPC collaborators.

use std::{io, time::Duration};

use mtlink_proto::ProtocolError;
use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket error.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation needs an open transport.
    #[error("transport is not connected")]
    NotConnected,

    /// Configuration could not be turned into a transport.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

/// Failures of a single RPC round trip.
#[derive(Debug, Error)]
pub enum RpcError {
    /// No response within the response timeout.
    #[error("no response after {0:?}")]
    Timeout(Duration),

    /// Server answered with an error.
    #[error("remote error {code}: {message}")]
    Remote {
        /// Numeric error code.
        code: i32,
        /// Error message.
        message: String,
    },

    /// Response did not answer the request that was sent.
    #[error("response id {got} does not match request id {expected}")]
    MismatchedResponse {
        /// Id of the request sent.
        expected: u64,
        /// Id echoed by the response.
        got: u64,
    },

    /// Malformed frame or payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport failed underneath the call.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<io::Error> for RpcError {
    fn from(err: io::Error) -> Self {
        Self::Transport(TransportError::Io(err))
    }
}
