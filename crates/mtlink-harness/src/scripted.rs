//! In-memory connection with scripted behavior.
//!
//! Every call is appended to a [`CallLog`] that tests keep a handle to after
//! the connection has been moved into a client:
//!
//! ```ignore
//! let connection = ScriptedConnection::new().with_reply(Reply::Hang);
//! let calls = connection.calls();
//! let client = Client::from_connection(connection, app_info);
//! // ...
//! assert_eq!(calls.connects(), 1);
//! ```

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use mtlink_core::{
    ClientConnection, ClientTransportState, ConnectionBuilder, ConnectionConfig, RpcError,
    RpcInvoker, TransportConfig, TransportConnectResult, TransportError,
};
use mtlink_proto::{Request, Response};
use tokio::sync::watch;

use crate::sample_config;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A call observed by a [`ScriptedConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `connect` was called.
    Connect,
    /// `disconnect` was called.
    Disconnect,
    /// `invoke` was called.
    Invoke {
        /// Request sent.
        request: Request,
        /// Transport state when the request was sent.
        transport_state: ClientTransportState,
    },
    /// `configure` was called.
    Configure(ConnectionConfig),
    /// `close` was called.
    Close,
}

/// Shared, append-only record of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    /// Copy of every call so far, in order.
    pub fn snapshot(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Total number of calls.
    pub fn len(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Whether no call was made.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `connect` calls.
    pub fn connects(&self) -> usize {
        self.count(|call| matches!(call, Call::Connect))
    }

    /// Number of `disconnect` calls.
    pub fn disconnects(&self) -> usize {
        self.count(|call| matches!(call, Call::Disconnect))
    }

    /// Number of `close` calls.
    pub fn closes(&self) -> usize {
        self.count(|call| matches!(call, Call::Close))
    }

    /// Requests sent through `invoke`, in order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                Call::Invoke { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }
}

/// What `connect` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Return this result. `Success` marks the transport connected.
    Result(TransportConnectResult),
    /// Fail with an I/O error of this kind.
    Error(io::ErrorKind),
}

/// What the next `invoke` does.
#[derive(Debug)]
pub enum Reply {
    /// Answer immediately.
    Respond(Response),
    /// Answer after a delay.
    Delayed(Duration, Response),
    /// Fail with this error.
    Fail(RpcError),
    /// Never answer.
    Hang,
}

/// Connection whose behavior is fixed up front.
///
/// Once the reply script runs out, `invoke` answers with
/// [`sample_config`].
#[derive(Debug)]
pub struct ScriptedConnection {
    log: CallLog,
    state: watch::Sender<ClientTransportState>,
    connect_outcome: ConnectOutcome,
    connect_delay: Duration,
    replies: Mutex<VecDeque<Reply>>,
    fail_disconnect: bool,
    connect_timeout: Mutex<Duration>,
    response_timeout: Mutex<Duration>,
}

impl Default for ScriptedConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConnection {
    /// Disconnected connection whose connect succeeds.
    pub fn new() -> Self {
        Self::with_log(CallLog::default())
    }

    fn with_log(log: CallLog) -> Self {
        let (state, _) = watch::channel(ClientTransportState::Disconnected);
        Self {
            log,
            state,
            connect_outcome: ConnectOutcome::Result(TransportConnectResult::Success),
            connect_delay: Duration::ZERO,
            replies: Mutex::new(VecDeque::new()),
            fail_disconnect: false,
            connect_timeout: Mutex::new(Duration::from_secs(10)),
            response_timeout: Mutex::new(Duration::from_secs(30)),
        }
    }

    /// Start out already connected.
    #[must_use]
    pub fn connected(self) -> Self {
        self.state.send_replace(ClientTransportState::Connected);
        self
    }

    /// Make `connect` return `result`.
    #[must_use]
    pub fn with_connect_result(mut self, result: TransportConnectResult) -> Self {
        self.connect_outcome = ConnectOutcome::Result(result);
        self
    }

    /// Make `connect` fail with an I/O error.
    #[must_use]
    pub fn with_connect_error(mut self, kind: io::ErrorKind) -> Self {
        self.connect_outcome = ConnectOutcome::Error(kind);
        self
    }

    /// Make `connect` take `delay` before resolving.
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Queue a reply for the next unanswered `invoke`.
    #[must_use]
    pub fn with_reply(self, reply: Reply) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Make `disconnect` fail.
    #[must_use]
    pub fn with_failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    /// Handle to the call log.
    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }
}

#[async_trait]
impl RpcInvoker for ScriptedConnection {
    async fn invoke(&self, request: Request) -> Result<Response, RpcError> {
        self.log.push(Call::Invoke { request, transport_state: self.state() });

        let reply = lock(&self.replies).pop_front();
        match reply.unwrap_or_else(|| Reply::Respond(Response::Config(sample_config()))) {
            Reply::Respond(response) => Ok(response),
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            },
            Reply::Fail(err) => Err(err),
            Reply::Hang => std::future::pending().await,
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
impl ClientConnection for ScriptedConnection {
    async fn connect(&self) -> Result<TransportConnectResult, TransportError> {
        self.log.push(Call::Connect);
        self.state.send_replace(ClientTransportState::Connecting);

        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        match self.connect_outcome {
            ConnectOutcome::Result(TransportConnectResult::Success) => {
                self.state.send_replace(ClientTransportState::Connected);
                Ok(TransportConnectResult::Success)
            },
            ConnectOutcome::Result(other) => {
                self.state.send_replace(ClientTransportState::Disconnected);
                Ok(other)
            },
            ConnectOutcome::Error(kind) => {
                self.state.send_replace(ClientTransportState::Disconnected);
                Err(io::Error::from(kind).into())
            },
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.log.push(Call::Disconnect);
        if self.fail_disconnect {
            return Err(io::Error::other("scripted disconnect failure").into());
        }
        self.state.send_replace(ClientTransportState::Disconnected);
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
        self.log.push(Call::Configure(config.clone()));
    }

    fn close(&self) {
        self.log.push(Call::Close);
        self.state.send_replace(ClientTransportState::Disconnected);
    }
}

/// Builds [`ScriptedConnection`]s that all record into one [`CallLog`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedBuilder {
    log: CallLog,
}

impl ScriptedBuilder {
    /// Handle to the shared call log.
    pub fn calls(&self) -> CallLog {
        self.log.clone()
    }
}

impl ConnectionBuilder for ScriptedBuilder {
    type Connection = ScriptedConnection;

    fn build_connection(
        &self,
        config: &TransportConfig,
    ) -> Result<Self::Connection, TransportError> {
        if config.host.is_empty() {
            return Err(TransportError::InvalidConfig("host must not be empty".to_string()));
        }
        Ok(ScriptedConnection::with_log(self.log.clone()))
    }
}
