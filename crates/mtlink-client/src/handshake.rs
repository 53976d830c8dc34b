//! Mandatory post-connect handshake.
//!
//! The server refuses every call on a connection until it has seen the layer
//! declaration, so the first request on a fresh transport is always:
//!
//! ```text
//! InvokeWithLayer { layer: LAYER,
//!   query: InitConnection { api_id, app_version, device_model, lang_code, system_version,
//!     query: GetConfig } }
//! ```
//!
//! The reply to the innermost `GetConfig` is the server configuration.

use mtlink_core::{RpcError, RpcInvoker};
use mtlink_proto::{ClientAppInfo, LAYER, Request, Response, ServerConfig};
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, Phase};

/// Build the layer/init/config request for `app_info`.
pub fn handshake_request(app_info: &ClientAppInfo) -> Request {
    Request::invoke_with_layer(Request::init_connection(app_info, Request::GetConfig))
}

/// Run the handshake once over `invoker` and return the server config.
///
/// Bounded by the invoker's default response timeout. Nothing is retried.
///
/// # Errors
///
/// - `ClientError::Timeout` (phase `Handshake`) if no response arrives in time
/// - `ClientError::HandshakeProtocol` if the response is not a config
/// - `ClientError::Rpc` for any other invoker failure
#[instrument(skip_all, fields(layer = LAYER, api_id = app_info.api_id()))]
pub async fn initialize_connection<I>(
    invoker: &I,
    app_info: &ClientAppInfo,
) -> Result<ServerConfig, ClientError>
where
    I: RpcInvoker + ?Sized,
{
    let limit = invoker.default_response_timeout();
    let request = handshake_request(app_info);
    debug!(method = request.method(), timeout = ?limit, "sending handshake");

    let response = match tokio::time::timeout(limit, invoker.invoke(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(RpcError::Timeout(after))) => {
            return Err(ClientError::Timeout { phase: Phase::Handshake, after });
        },
        Ok(Err(err)) => return Err(err.into()),
        Err(_) => return Err(ClientError::Timeout { phase: Phase::Handshake, after: limit }),
    };

    match response {
        Response::Config(config) => {
            info!(this_dc = config.this_dc, dc_options = config.dc_options.len(), "handshake complete");
            Ok(config)
        },
        other => {
            warn!(got = other.kind(), "handshake answered with something other than a config");
            Err(ClientError::HandshakeProtocol { got: other.kind() })
        },
    }
}
