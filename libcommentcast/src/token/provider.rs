//! OAuth access token acquisition for the SoundCloud API

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::TokenError;
use crate::token::store::{TokenRecord, TokenStore};

/// Access tokens are renewed this long before their reported expiry
pub const EXPIRY_SKEW_MILLIS: i64 = 60_000;

/// Anything that can hand out a bearer token for upstream requests
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, TokenError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: u64,
}

enum Grant {
    ClientCredentials,
    RefreshToken(String),
}

impl Grant {
    fn name(&self) -> &'static str {
        match self {
            Grant::ClientCredentials => "client_credentials",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }
}

/// Mints, refreshes and caches SoundCloud access tokens
///
/// The in-memory record sits behind an async mutex held across the upstream
/// exchange, so concurrent callers wait for one exchange instead of racing.
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    store: TokenStore,
    cached: Mutex<Option<TokenRecord>>,
}

impl TokenProvider {
    pub fn new(
        client: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        store: TokenStore,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
            store,
            cached: Mutex::new(None),
        }
    }

    async fn exchange(
        &self,
        grant: &Grant,
        previous_refresh: Option<&str>,
    ) -> Result<TokenRecord, TokenError> {
        debug!("Requesting {} exchange at {}", grant.name(), self.token_url);

        let request = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json; charset=utf-8");

        let request = match grant {
            Grant::ClientCredentials => request
                .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
                .form(&[("grant_type", "client_credentials")]),
            Grant::RefreshToken(refresh_token) => request.form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                grant = grant.name(),
                "Token request failed: {}",
                truncate(&body, 200)
            );
            return Err(TokenError::UpstreamRejected {
                grant: grant.name(),
                status: status.as_u16(),
            });
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        let refresh_token = payload
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .unwrap_or_default();

        info!(
            grant = grant.name(),
            expires_in = payload.expires_in,
            "Obtained SoundCloud access token"
        );

        Ok(TokenRecord::from_exchange(
            payload.access_token,
            refresh_token,
            payload.expires_in,
            now_millis(),
        ))
    }

    fn persist(&self, record: &TokenRecord) -> Result<(), TokenError> {
        self.store.save(record)?;
        Ok(())
    }
}

#[async_trait]
impl AccessTokenSource for TokenProvider {
    /// Return a usable access token
    ///
    /// 1. cached and unexpired: returned without a network call
    /// 2. refresh token known: `refresh_token` exchange
    /// 3. otherwise, or when the refresh is rejected: `client_credentials` mint
    ///
    /// A rejected mint is terminal for the run.
    async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.store.load()?;
        }

        if let Some(record) = cached.as_ref() {
            if record.access_valid_at(now_millis(), EXPIRY_SKEW_MILLIS) {
                debug!("Using cached access token");
                return Ok(record.access_token.clone());
            }

            if record.has_refresh_token() {
                let refresh_token = record.refresh_token.clone();
                match self
                    .exchange(&Grant::RefreshToken(refresh_token.clone()), Some(&refresh_token))
                    .await
                {
                    Ok(renewed) => {
                        self.persist(&renewed)?;
                        let token = renewed.access_token.clone();
                        *cached = Some(renewed);
                        return Ok(token);
                    }
                    Err(TokenError::UpstreamRejected { status, .. }) => {
                        warn!(status, "Refresh token rejected, minting a new token pair");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let minted = self.exchange(&Grant::ClientCredentials, None).await?;
        self.persist(&minted)?;
        let token = minted.access_token.clone();
        *cached = Some(minted);
        Ok(token)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_names() {
        assert_eq!(Grant::ClientCredentials.name(), "client_credentials");
        assert_eq!(
            Grant::RefreshToken("r".to_string()).name(),
            "refresh_token"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }

    #[test]
    fn test_token_response_without_refresh_token() {
        let payload: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "expires_in": 3600}"#).unwrap();
        assert_eq!(payload.access_token, "a");
        assert!(payload.refresh_token.is_none());
    }
}
