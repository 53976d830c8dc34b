//! Nested request tree.
//!
//! Wrapping requests carry their inner query as a boxed [`Request`], so a
//! wrapper never needs to know what it wraps:
//!
//! ```text
//! InvokeWithLayer { layer, query: ─┐
//!                                  ▼
//!   InitConnection { api_id, ..., query: ─┐
//!                                         ▼
//!     GetConfig
//! ```

use serde::{Deserialize, Serialize};

use crate::app_info::ClientAppInfo;

/// Schema layer this client speaks.
///
/// Declared on the first request of every connection.
pub const LAYER: u32 = 18;

/// A remote call, possibly wrapping another remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Run `query` using the given schema layer.
    InvokeWithLayer {
        /// Schema layer version.
        layer: u32,
        /// Wrapped request.
        query: Box<Request>,
    },

    /// Declare client identity, then run `query`.
    InitConnection {
        /// Numeric application id.
        api_id: i32,
        /// Application version.
        app_version: String,
        /// Device model.
        device_model: String,
        /// Language code.
        lang_code: String,
        /// Operating system version.
        system_version: String,
        /// Wrapped request.
        query: Box<Request>,
    },

    /// Fetch the server configuration.
    GetConfig,
}

impl Request {
    /// Wrap `query` in a layer declaration for [`LAYER`].
    pub fn invoke_with_layer(query: Self) -> Self {
        Self::InvokeWithLayer { layer: LAYER, query: Box::new(query) }
    }

    /// Wrap `query` in a connection init carrying `app_info`.
    pub fn init_connection(app_info: &ClientAppInfo, query: Self) -> Self {
        Self::InitConnection {
            api_id: app_info.api_id(),
            app_version: app_info.app_version().to_string(),
            device_model: app_info.device_model().to_string(),
            lang_code: app_info.lang_code().to_string(),
            system_version: app_info.system_version().to_string(),
            query: Box::new(query),
        }
    }

    /// Inner request, if this one wraps another.
    pub fn inner(&self) -> Option<&Self> {
        match self {
            Self::InvokeWithLayer { query, .. } | Self::InitConnection { query, .. } => {
                Some(query.as_ref())
            },
            Self::GetConfig => None,
        }
    }

    /// The request at the bottom of the wrapper chain.
    pub fn innermost(&self) -> &Self {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }

    /// Short method name, for logging.
    pub fn method(&self) -> &'static str {
        match self {
            Self::InvokeWithLayer { .. } => "invokeWithLayer",
            Self::InitConnection { .. } => "initConnection",
            Self::GetConfig => "help.getConfig",
        }
    }
}
