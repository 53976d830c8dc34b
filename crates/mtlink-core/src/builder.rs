//! Connection construction.

use crate::{config::TransportConfig, connection::ClientConnection, error::TransportError};

/// Builds a connection from transport configuration.
///
/// Used once, when the client is constructed.
pub trait ConnectionBuilder {
    /// Connection type produced by this builder.
    type Connection: ClientConnection;

    /// Build an unconnected connection for `config`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidConfig` if the configuration does not
    /// describe a transport this builder can produce.
    fn build_connection(&self, config: &TransportConfig)
    -> Result<Self::Connection, TransportError>;
}
