//! Calls issued after the handshake.

use std::sync::Arc;

use mtlink_core::ClientConnection;
use mtlink_proto::{Request, Response, ServerConfig};

use crate::{client::Shared, error::ClientError};

/// Invoker handle for calls on a handshaken connection.
///
/// Obtained from [`crate::Client::methods`]. Every call checks the client
/// again: it fails with `Disposed` once disposal began and with
/// `HandshakeRequired` until the current transport session has completed
/// its handshake.
pub struct Methods<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for Methods<C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<C: ClientConnection> Methods<C> {
    pub(crate) fn new(shared: Arc<Shared<C>>) -> Self {
        Self { shared }
    }

    /// Send an arbitrary request.
    pub async fn invoke(&self, request: Request) -> Result<Response, ClientError> {
        let connection = self.shared.ready_connection()?;
        Ok(connection.invoke(request).await?)
    }

    /// Fetch a fresh server config.
    pub async fn get_config(&self) -> Result<ServerConfig, ClientError> {
        let response = self.invoke(Request::GetConfig).await?;
        let got = response.kind();
        response.into_config().ok_or(ClientError::UnexpectedResponse {
            method: Request::GetConfig.method(),
            got,
        })
    }
}
