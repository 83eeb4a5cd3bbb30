//! Shared HTTP client construction

use crate::config::HttpConfig;
use crate::error::{ConfigError, Result};

/// Build the client used for every upstream call
///
/// The configured timeout bounds each request, which in turn bounds how long a
/// single selection attempt can hang on a stalled upstream.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let timeout = config.timeout_duration()?;
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| {
            ConfigError::InvalidValue {
                field: "http".to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}
