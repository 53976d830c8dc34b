//! RPC invoker contract.

use std::time::Duration;

use async_trait::async_trait;
use mtlink_proto::{Request, Response};

use crate::error::RpcError;

/// Performs request/response round trips over an established connection.
///
/// Encryption and message sequencing happen behind this trait; callers only
/// see request and response values.
#[async_trait]
pub trait RpcInvoker: Send + Sync {
    /// Send `request` and wait for its response.
    ///
    /// # Errors
    ///
    /// - `RpcError::Timeout` if no response arrives within
    ///   [`RpcInvoker::default_response_timeout`]
    /// - `RpcError::Remote` if the server answered with an error
    /// - `RpcError::Protocol` or `RpcError::Transport` on malformed frames or
    ///   broken connections
    async fn invoke(&self, request: Request) -> Result<Response, RpcError>;

    /// Time allowed for a response.
    fn default_response_timeout(&self) -> Duration;

    /// Change the time allowed for a response.
    fn set_default_response_timeout(&self, timeout: Duration);
}
