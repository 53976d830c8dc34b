//! Simulated server for turmoil scenarios.
//!
//! Enforces the connection rule real servers apply: until a connection has
//! sent an `InitConnection` wrapped in a layer declaration, every call fails
//! with `CONNECTION_NOT_INITED`. Connections are served one after another,
//! which is enough for a single client.

use std::{
    error::Error,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use mtlink_core::{RpcError, TransportError};
use mtlink_proto::{DcOption, Envelope, LAYER, Request, Response, ServerConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;
use turmoil::net::{TcpListener, TcpStream};

use crate::{sample_config, wire};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Error code for calls made before the handshake.
pub const NOT_INITED_CODE: i32 = 400;

/// Handshake-enforcing config server.
///
/// Clones share the request log, so a test can keep one clone and hand
/// another to `sim.host`.
#[derive(Debug, Clone)]
pub struct SimServer {
    config: ServerConfig,
    received: Arc<Mutex<Vec<Request>>>,
    accepted: Arc<AtomicUsize>,
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new(sample_config())
    }
}

impl SimServer {
    /// Server answering config requests with `config`.
    pub fn new(config: ServerConfig) -> Self {
        Self { config, received: Arc::default(), accepted: Arc::default() }
    }

    /// Server with a config derived from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dc_count = rng.gen_range(1..=5);
        let dc_options = (1..=dc_count)
            .map(|id| DcOption {
                id,
                hostname: format!("dc{id}.sim"),
                ip_address: format!("10.0.0.{id}"),
                port: 443,
            })
            .collect();
        let date = rng.gen_range(1_600_000_000..1_700_000_000);

        Self::new(ServerConfig {
            date,
            expires: date + 3600,
            test_mode: rng.gen_bool(0.5),
            this_dc: rng.gen_range(1..=dc_count),
            dc_options,
            chat_size_max: 200,
        })
    }

    /// Config this server hands out.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Every request received, across all connections, in order.
    pub fn received(&self) -> Vec<Request> {
        lock(&self.received).clone()
    }

    /// Number of connections accepted.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Accept and serve connections on `bind` forever.
    pub async fn serve(self, bind: &str) -> Result<(), Box<dyn Error>> {
        let listener = TcpListener::bind(bind).await?;
        loop {
            let (stream, peer) = listener.accept().await?;
            self.accepted.fetch_add(1, Ordering::SeqCst);
            debug!(%peer, "accepted connection");

            if let Err(err) = self.handle(stream).await {
                debug!(%peer, error = %err, "connection ended with error");
            }
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<(), RpcError> {
        let mut initialized = false;
        loop {
            let envelope: Envelope<Request> = match wire::read_frame(&mut stream).await {
                Ok(envelope) => envelope,
                Err(RpcError::Transport(TransportError::Io(err)))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(());
                },
                Err(err) => return Err(err),
            };

            lock(&self.received).push(envelope.body.clone());
            let response = self.respond(&envelope.body, &mut initialized);
            wire::write_frame(&mut stream, &Envelope::new(envelope.msg_id, response)).await?;
        }
    }

    fn respond(&self, request: &Request, initialized: &mut bool) -> Response {
        match request {
            Request::InvokeWithLayer { layer, query } if *layer == LAYER => match query.as_ref() {
                Request::InitConnection { query, .. } => {
                    *initialized = true;
                    self.execute(query)
                },
                other if *initialized => self.execute(other),
                _ => not_inited(),
            },
            Request::InvokeWithLayer { layer, .. } => Response::Error {
                code: NOT_INITED_CODE,
                message: format!("LAYER_INVALID_{layer}"),
            },
            other if *initialized => self.execute(other),
            _ => not_inited(),
        }
    }

    fn execute(&self, request: &Request) -> Response {
        match request {
            Request::GetConfig => Response::Config(self.config.clone()),
            other => Response::Error {
                code: NOT_INITED_CODE,
                message: format!("METHOD_INVALID_{}", other.method()),
            },
        }
    }
}

fn not_inited() -> Response {
    Response::Error { code: NOT_INITED_CODE, message: "CONNECTION_NOT_INITED".to_string() }
}
