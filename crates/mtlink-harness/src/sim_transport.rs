//! Framed TCP connection over turmoil's simulated network.
//!
//! One request is in flight at a time: `invoke` holds the stream for the
//! whole write-then-read exchange and checks that the response echoes the
//! request's message id. A response timeout drops the stream and leaves the
//! connection `Disconnected`.

use std::{
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use mtlink_core::{
    ClientConnection, ClientTransportState, ConnectionBuilder, ConnectionConfig, RpcError,
    RpcInvoker, TransportConfig, TransportConnectResult, TransportError,
};
use mtlink_proto::{Envelope, Request, Response};
use tokio::{io::AsyncWriteExt, sync::watch};
use tracing::debug;
use turmoil::net::TcpStream;

use crate::wire;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client connection over a simulated TCP stream.
pub struct SimConnection {
    address: String,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
    state: watch::Sender<ClientTransportState>,
    next_msg_id: AtomicU64,
    connect_timeout: Mutex<Duration>,
    response_timeout: Mutex<Duration>,
    session: Mutex<ConnectionConfig>,
}

impl SimConnection {
    /// Unconnected connection to `address` (`host:port`).
    pub fn new(address: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ClientTransportState::Disconnected);
        let session = ConnectionConfig::default();
        Self {
            address: address.into(),
            stream: tokio::sync::Mutex::new(None),
            state,
            next_msg_id: AtomicU64::new(1),
            connect_timeout: Mutex::new(Duration::from_secs(10)),
            response_timeout: Mutex::new(session.default_response_timeout),
            session: Mutex::new(session),
        }
    }

    /// Session parameters last applied through `configure`.
    pub fn session(&self) -> ConnectionConfig {
        lock(&self.session).clone()
    }

    fn set_state(&self, state: ClientTransportState) {
        self.state.send_replace(state);
    }
}

#[async_trait]
impl RpcInvoker for SimConnection {
    async fn invoke(&self, request: Request) -> Result<Response, RpcError> {
        let limit = self.default_response_timeout();
        let msg_id = self.next_msg_id.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        debug!(msg_id, method = request.method(), "sending request");
        let exchange = async {
            wire::write_frame(stream, &Envelope::new(msg_id, request)).await?;
            wire::read_frame::<_, Response>(stream).await
        };
        let outcome = tokio::time::timeout(limit, exchange).await;
        let envelope = match outcome {
            Ok(result) => result?,
            Err(_) => {
                // A late reply would be read as the answer to the next request
                guard.take();
                self.set_state(ClientTransportState::Disconnected);
                debug!(msg_id, "response timed out, dropping stream");
                return Err(RpcError::Timeout(limit));
            },
        };

        if envelope.msg_id != msg_id {
            return Err(RpcError::MismatchedResponse { expected: msg_id, got: envelope.msg_id });
        }

        match envelope.body {
            Response::Error { code, message } => Err(RpcError::Remote { code, message }),
            response => Ok(response),
        }
    }

    fn default_response_timeout(&self) -> Duration {
        *lock(&self.response_timeout)
    }

    fn set_default_response_timeout(&self, timeout: Duration) {
        *lock(&self.response_timeout) = timeout;
    }
}

#[async_trait]
impl ClientConnection for SimConnection {
    async fn connect(&self) -> Result<TransportConnectResult, TransportError> {
        let started = self.state.send_if_modified(|state| match state {
            ClientTransportState::Connecting | ClientTransportState::Connected => false,
            _ => {
                *state = ClientTransportState::Connecting;
                true
            },
        });
        if !started {
            return Ok(match self.state() {
                ClientTransportState::Connected => TransportConnectResult::Success,
                _ => TransportConnectResult::AlreadyConnecting,
            });
        }

        match TcpStream::connect(self.address.as_str()).await {
            Ok(stream) => {
                *self.stream.lock().await = Some(stream);
                self.set_state(ClientTransportState::Connected);
                debug!(address = %self.address, "transport connected");
                Ok(TransportConnectResult::Success)
            },
            Err(err) => {
                self.set_state(ClientTransportState::Disconnected);
                debug!(address = %self.address, error = %err, "transport connect failed");
                Ok(TransportConnectResult::Failed)
            },
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let stream = self.stream.lock().await.take();
        let Some(mut stream) = stream else {
            self.set_state(ClientTransportState::Disconnected);
            return Ok(());
        };

        self.set_state(ClientTransportState::Disconnecting);
        let result = stream.shutdown().await;
        self.set_state(ClientTransportState::Disconnected);
        result?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state() == ClientTransportState::Connected
    }

    fn state(&self) -> ClientTransportState {
        *self.state.borrow()
    }

    fn state_changes(&self) -> watch::Receiver<ClientTransportState> {
        self.state.subscribe()
    }

    fn connect_timeout(&self) -> Duration {
        *lock(&self.connect_timeout)
    }

    fn set_connect_timeout(&self, timeout: Duration) {
        *lock(&self.connect_timeout) = timeout;
    }

    fn configure(&self, config: &ConnectionConfig) {
        *lock(&self.session) = config.clone();
    }

    fn close(&self) {
        if let Ok(mut stream) = self.stream.try_lock() {
            stream.take();
        }
        self.set_state(ClientTransportState::Disconnected);
    }
}

/// Builds [`SimConnection`]s from a transport config.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimConnectionBuilder;

impl ConnectionBuilder for SimConnectionBuilder {
    type Connection = SimConnection;

    fn build_connection(
        &self,
        config: &TransportConfig,
    ) -> Result<Self::Connection, TransportError> {
        if config.host.is_empty() || config.port == 0 {
            return Err(TransportError::InvalidConfig(config.address()));
        }
        Ok(SimConnection::new(config.address()))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use turmoil::net::TcpListener;

    use super::*;

    /// Server that answers every first request two seconds late.
    async fn slow_server() -> Result<(), Box<dyn Error>> {
        let listener = TcpListener::bind("0.0.0.0:443").await?;
        loop {
            let (mut stream, _) = listener.accept().await?;
            let envelope: Envelope<Request> = wire::read_frame(&mut stream).await?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            let reply = Envelope::new(envelope.msg_id, Response::Bool(true));
            // The client may already be gone
            let _ = wire::write_frame(&mut stream, &reply).await;
        }
    }

    #[test]
    fn response_timeout_drops_the_stream() {
        let mut sim = turmoil::Builder::new().build();
        sim.host("server", slow_server);

        sim.client("client", async {
            let connection = SimConnection::new("server:443");
            connection.set_default_response_timeout(Duration::from_secs(1));
            assert!(connection.connect().await?.is_success());

            let result = connection.invoke(Request::GetConfig).await;
            assert!(matches!(result, Err(RpcError::Timeout(_))), "got {result:?}");
            assert_eq!(connection.state(), ClientTransportState::Disconnected);

            // No stale reply is left to be mistaken for the next answer
            let result = connection.invoke(Request::GetConfig).await;
            assert!(
                matches!(result, Err(RpcError::Transport(TransportError::NotConnected))),
                "got {result:?}"
            );
            Ok(())
        });

        sim.run().expect("timeout should leave the connection disconnected");
    }
}
