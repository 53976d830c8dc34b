//! Identity of the calling application.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Identifies the calling application to the server.
///
/// Sent once per connection as part of the handshake. Immutable after
/// construction. Deserializing runs the same checks as
/// [`ClientAppInfo::new`], so a value with a blank field never exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAppInfo")]
pub struct ClientAppInfo {
    api_id: i32,
    app_version: String,
    device_model: String,
    lang_code: String,
    system_version: String,
}

/// Unchecked wire shape of [`ClientAppInfo`].
#[derive(Deserialize)]
struct RawAppInfo {
    api_id: i32,
    app_version: String,
    device_model: String,
    lang_code: String,
    system_version: String,
}

impl TryFrom<RawAppInfo> for ClientAppInfo {
    type Error = ProtocolError;

    fn try_from(raw: RawAppInfo) -> Result<Self> {
        Self::new(raw.api_id, raw.app_version, raw.device_model, raw.lang_code, raw.system_version)
    }
}

impl ClientAppInfo {
    /// Create application info, rejecting empty identity strings.
    pub fn new(
        api_id: i32,
        app_version: impl Into<String>,
        device_model: impl Into<String>,
        lang_code: impl Into<String>,
        system_version: impl Into<String>,
    ) -> Result<Self> {
        let info = Self {
            api_id,
            app_version: app_version.into(),
            device_model: device_model.into(),
            lang_code: lang_code.into(),
            system_version: system_version.into(),
        };
        info.validate()?;
        Ok(info)
    }

    /// Check that every string field is present.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("app_version", &self.app_version),
            ("device_model", &self.device_model),
            ("lang_code", &self.lang_code),
            ("system_version", &self.system_version),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ProtocolError::MissingAppInfo(*name)),
            None => Ok(()),
        }
    }

    /// Numeric application id.
    pub fn api_id(&self) -> i32 {
        self.api_id
    }

    /// Application version string.
    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Device model string.
    pub fn device_model(&self) -> &str {
        &self.device_model
    }

    /// Language code string.
    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    /// Operating system version string.
    pub fn system_version(&self) -> &str {
        &self.system_version
    }
}
