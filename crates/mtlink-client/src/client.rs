//! Client facade.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect ┌────────────┐ Success ┌─────────────┐  Config  ┌───────────┐
//! │ Disconnected │────────>│ Connecting │────────>│ Handshaking │─────────>│ Connected │
//! └──────────────┘         └────────────┘         └─────────────┘          └───────────┘
//!        ▲                        │ failure              │ error                 │
//!        └────────────────────────┘                      ▼                       │ disconnect
//!        ▲                                         error returned                ▼
//!        │                                                              ┌───────────────┐
//!        └──────────────────────────────────────────────────────────────│ Disconnecting │
//!                                                                       └───────────────┘
//! ```
//!
//! Overlaid on this, the [`LifecycleState`] only moves forward. Once disposal
//! begins every operation fails with [`ClientError::Disposed`] before touching
//! the transport.
//!
//! # Concurrency
//!
//! `connect`, `disconnect`, `initialize_connection` and teardown all hold one
//! transition lock, so their suspension points never interleave. The
//! lifecycle is checked again after the lock is acquired: an operation that
//! queued behind a teardown fails instead of reviving the connection.

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use mtlink_core::{
    ClientConnection, ClientTransportState, ConnectionBuilder, ConnectionConfig, TransportConfig,
    TransportConnectResult,
};
use mtlink_proto::{ClientAppInfo, ServerConfig};
use tokio::{runtime::Handle, sync::watch};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{ClientError, Phase},
    handshake,
    lifecycle::{LifecycleGuard, LifecycleState},
    methods::Methods,
};

/// Session-lifecycle facade over one transport-backed connection.
///
/// Dropping the client schedules the same teardown as [`Client::dispose`].
/// That teardown runs as a detached task and is lost if the runtime shuts
/// down first; await [`Client::shutdown`] to be sure it ran.
pub struct Client<C: ClientConnection> {
    app_info: ClientAppInfo,
    shared: Arc<Shared<C>>,
}

/// State reachable from a detached teardown task and from [`Methods`].
pub(crate) struct Shared<C> {
    lifecycle: LifecycleGuard,
    /// Serializes connect, disconnect, re-handshake and teardown.
    transitions: tokio::sync::Mutex<()>,
    connection: Mutex<Option<Arc<C>>>,
    config: Mutex<Option<ServerConfig>>,
    /// Set only while the current transport session has completed its
    /// handshake.
    ready: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: ClientConnection> Shared<C> {
    /// Lifecycle check plus handle lookup. Every public operation starts here.
    fn connection(&self) -> Result<Arc<C>, ClientError> {
        self.lifecycle.ensure_active()?;
        lock(&self.connection).clone().ok_or(ClientError::Disposed)
    }

    /// Connection for a call after the handshake.
    ///
    /// Fails with `HandshakeRequired` while a connect, disconnect or
    /// handshake is in progress or the last handshake failed.
    pub(crate) fn ready_connection(&self) -> Result<Arc<C>, ClientError> {
        let connection = self.connection()?;
        if !self.ready.load(Ordering::Acquire) {
            return Err(ClientError::HandshakeRequired);
        }
        Ok(connection)
    }

    fn set_config(&self, config: Option<ServerConfig>) {
        *lock(&self.config) = config;
    }

    fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Disconnect, release, clear. Runs at most once per client.
    #[instrument(skip_all)]
    async fn teardown(self: Arc<Self>) {
        debug!("teardown started");
        let _transition = self.transitions.lock().await;
        self.set_ready(false);

        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            debug!("disconnecting for disposal");
            if let Err(err) = connection.disconnect().await {
                warn!(error = %err, "disconnect failed during disposal, releasing anyway");
            }
            connection.close();
        }

        self.set_config(None);
        self.lifecycle.finish_dispose();
        debug!("client disposed");
    }

    /// Teardown without a disconnect, for when no runtime is available.
    fn release_now(&self) {
        self.set_ready(false);
        let connection = lock(&self.connection).take();
        if let Some(connection) = connection {
            connection.close();
        }
        self.set_config(None);
        self.lifecycle.finish_dispose();
    }
}

impl<C: ClientConnection> Client<C> {
    /// Wrap an already built connection.
    ///
    /// `app_info` needs no further check: every way to obtain one, including
    /// deserialization, rejects blank fields.
    pub fn from_connection(connection: C, app_info: ClientAppInfo) -> Self {
        Self {
            app_info,
            shared: Arc::new(Shared {
                lifecycle: LifecycleGuard::new(),
                transitions: tokio::sync::Mutex::new(()),
                connection: Mutex::new(Some(Arc::new(connection))),
                config: Mutex::new(None),
                ready: AtomicBool::new(false),
            }),
        }
    }

    /// Build the connection with `builder`, then apply both configs to it.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidAppInfo` if an identity field is empty
    /// - `ClientError::Transport` if the builder rejects `transport_config`
    pub fn with_builder<B>(
        builder: &B,
        transport_config: &TransportConfig,
        connection_config: &ConnectionConfig,
        app_info: ClientAppInfo,
    ) -> Result<Self, ClientError>
    where
        B: ConnectionBuilder<Connection = C>,
    {
        app_info.validate()?;

        let connection = builder.build_connection(transport_config)?;
        connection.configure(connection_config);
        connection.set_connect_timeout(transport_config.connect_timeout);
        connection.set_default_response_timeout(connection_config.default_response_timeout);

        Ok(Self::from_connection(connection, app_info))
    }

    /// Same as [`Client::with_builder`] using `B::default()`.
    pub fn new<B>(
        transport_config: &TransportConfig,
        connection_config: &ConnectionConfig,
        app_info: ClientAppInfo,
    ) -> Result<Self, ClientError>
    where
        B: ConnectionBuilder<Connection = C> + Default,
    {
        Self::with_builder(&B::default(), transport_config, connection_config, app_info)
    }

    /// Connect the transport and run the handshake.
    ///
    /// Returns `Success` without a handshake if the transport already reports
    /// connected once any in-flight transition has finished. A non-success transport result is returned
    /// as is and no handshake is attempted. Otherwise this only returns once
    /// the handshake finished, and the new server config is cached.
    ///
    /// # Errors
    ///
    /// - `ClientError::Disposed` after disposal began
    /// - `ClientError::Timeout` if either phase exceeds its timeout; a transport
    ///   connect that timed out is disconnected before returning
    /// - `ClientError::Transport` on transport I/O failure
    /// - `ClientError::HandshakeProtocol` / `ClientError::Rpc` if the handshake
    ///   fails; the cached config is cleared
    #[instrument(skip(self), fields(api_id = self.app_info.api_id()))]
    pub async fn connect(&self) -> Result<TransportConnectResult, ClientError> {
        self.shared.connection()?;
        let _transition = self.shared.transitions.lock().await;

        let connection = self.shared.connection()?;
        if connection.is_connected() {
            debug!("already connected");
            return Ok(TransportConnectResult::Success);
        }

        self.shared.set_ready(false);
        let limit = connection.connect_timeout();
        debug!(timeout = ?limit, "connecting transport");
        let Ok(result) = tokio::time::timeout(limit, connection.connect()).await else {
            warn!(timeout = ?limit, "transport connect timed out, resetting transport");
            if let Err(err) = connection.disconnect().await {
                warn!(error = %err, "disconnect after connect timeout failed");
            }
            return Err(ClientError::Timeout { phase: Phase::Connect, after: limit });
        };
        let result = result?;

        if !result.is_success() {
            warn!(?result, "transport connect did not succeed, skipping handshake");
            return Ok(result);
        }

        debug!("transport connected, handshaking");
        self.handshake(connection.as_ref()).await?;
        info!("connected");
        Ok(result)
    }

    /// Re-run the handshake on an already connected transport.
    ///
    /// This is the retry path after a failed handshake: `connect` short-cuts
    /// on a connected transport and would not repeat it.
    ///
    /// # Errors
    ///
    /// `ClientError::NotConnected` if the transport is down, otherwise as for
    /// the handshake step of [`Client::connect`].
    #[instrument(skip(self))]
    pub async fn initialize_connection(&self) -> Result<ServerConfig, ClientError> {
        self.shared.connection()?;
        let _transition = self.shared.transitions.lock().await;

        let connection = self.shared.connection()?;
        if !connection.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.handshake(connection.as_ref()).await
    }

    async fn handshake(&self, connection: &C) -> Result<ServerConfig, ClientError> {
        self.shared.set_ready(false);
        match handshake::initialize_connection(connection, &self.app_info).await {
            Ok(config) => {
                self.shared.set_config(Some(config.clone()));
                self.shared.set_ready(true);
                Ok(config)
            },
            Err(err) => {
                self.shared.set_config(None);
                Err(err)
            },
        }
    }

    /// Disconnect the transport. The cached config is kept.
    ///
    /// # Errors
    ///
    /// `ClientError::Disposed` after disposal began, or the transport's error.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.shared.connection()?;
        let _transition = self.shared.transitions.lock().await;

        let connection = self.shared.connection()?;
        self.shared.set_ready(false);
        debug!("disconnecting transport");
        connection.disconnect().await?;
        Ok(())
    }

    /// Begin disposal and schedule teardown on the current tokio runtime.
    ///
    /// Returns immediately. Teardown waits for in-flight transitions,
    /// disconnects (logging, never raising, on failure), releases the
    /// connection and ends in [`LifecycleState::Disposed`]. Without a runtime
    /// the connection is released without a disconnect. Calls after the first
    /// are no-ops.
    pub fn dispose(&self) {
        if !self.shared.lifecycle.begin_dispose() {
            return;
        }

        match Handle::try_current() {
            Ok(runtime) => {
                debug!("scheduling teardown");
                drop(runtime.spawn(Arc::clone(&self.shared).teardown()));
            },
            Err(_) => {
                warn!("no async runtime available, releasing connection without disconnect");
                self.shared.release_now();
            },
        }
    }

    /// Dispose and wait for teardown to finish.
    ///
    /// A call made after disposal already began only waits for the pending
    /// teardown.
    pub async fn shutdown(&self) {
        if !self.shared.lifecycle.begin_dispose() {
            self.wait_disposed().await;
            return;
        }
        Arc::clone(&self.shared).teardown().await;
    }

    /// Wait until teardown has finished.
    pub async fn wait_disposed(&self) {
        self.shared.lifecycle.wait_disposed().await;
    }

    /// Current disposal state. Never fails.
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.shared.lifecycle.state()
    }

    /// Application identity sent with the handshake.
    pub fn app_info(&self) -> &ClientAppInfo {
        &self.app_info
    }

    /// Whether the transport is connected.
    pub fn is_connected(&self) -> Result<bool, ClientError> {
        Ok(self.shared.connection()?.is_connected())
    }

    /// Current transport state.
    pub fn state(&self) -> Result<ClientTransportState, ClientError> {
        Ok(self.shared.connection()?.state())
    }

    /// Subscribe to transport state changes.
    pub fn state_changes(&self) -> Result<watch::Receiver<ClientTransportState>, ClientError> {
        Ok(self.shared.connection()?.state_changes())
    }

    /// Config from the last successful handshake, if any.
    pub fn config(&self) -> Result<Option<ServerConfig>, ClientError> {
        self.shared.lifecycle.ensure_active()?;
        Ok(lock(&self.shared.config).clone())
    }

    /// Invoker for calls after the handshake.
    ///
    /// The handle re-checks the client on every call, so it stops working
    /// once disposal begins and while a reconnect is still handshaking.
    ///
    /// # Errors
    ///
    /// `ClientError::HandshakeRequired` while no handshake has completed.
    pub fn methods(&self) -> Result<Methods<C>, ClientError> {
        self.shared.connection()?;
        if lock(&self.shared.config).is_none() {
            return Err(ClientError::HandshakeRequired);
        }
        Ok(Methods::new(Arc::clone(&self.shared)))
    }

    /// Response timeout used for every call, the handshake included.
    pub fn default_response_timeout(&self) -> Result<Duration, ClientError> {
        Ok(self.shared.connection()?.default_response_timeout())
    }

    /// Change the response timeout.
    pub fn set_default_response_timeout(&self, timeout: Duration) -> Result<(), ClientError> {
        self.shared.connection()?.set_default_response_timeout(timeout);
        Ok(())
    }

    /// Transport connect timeout.
    pub fn connect_timeout(&self) -> Result<Duration, ClientError> {
        Ok(self.shared.connection()?.connect_timeout())
    }

    /// Change the transport connect timeout.
    pub fn set_connect_timeout(&self, timeout: Duration) -> Result<(), ClientError> {
        self.shared.connection()?.set_connect_timeout(timeout);
        Ok(())
    }
}

impl<C: ClientConnection> Drop for Client<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
