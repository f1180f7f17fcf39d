//! Remote source fetching configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// HTTP settings used when a conversion input is a remote locator.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds.
    #[validate(range(min = 1, max = 600))]
    pub timeout_seconds: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Responses larger than this are rejected.
    #[validate(range(min = 1))]
    pub max_response_bytes: u64,
    /// Honour `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
            max_response_bytes: default_max_response_bytes(),
            system_proxy: true,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("meshport/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_response_bytes() -> u64 {
    512 * 1024 * 1024
}
