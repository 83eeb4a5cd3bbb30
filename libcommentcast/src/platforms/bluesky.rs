//! Bluesky publishing over AT Protocol XRPC
//!
//! Each publish opens a session with `com.atproto.server.createSession` and
//! writes an `app.bsky.feed.post` record with `com.atproto.repo.createRecord`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BlueskyConfig;
use crate::credentials::BlueskyCredentials;
use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::types::PostReference;

const CHARACTER_LIMIT: usize = 300;
const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'static str,
    text: &'a str,
    created_at: String,
    langs: [&'static str; 1],
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'static str,
    record: PostRecord<'a>,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Deserialize, Default)]
struct XrpcError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

pub struct BlueskyPlatform {
    client: reqwest::Client,
    service: String,
    identifier: String,
    password: SecretString,
}

impl BlueskyPlatform {
    pub fn new(
        client: reqwest::Client,
        service: impl Into<String>,
        identifier: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            client,
            service: service.into().trim_end_matches('/').to_string(),
            identifier: identifier.into(),
            password,
        }
    }

    pub fn from_config(
        client: reqwest::Client,
        config: &BlueskyConfig,
        credentials: &BlueskyCredentials,
    ) -> Self {
        Self::new(
            client,
            config.service.clone(),
            credentials.identifier.clone(),
            credentials.password.clone(),
        )
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service, method)
    }

    async fn create_session(&self) -> PlatformResult<Session> {
        let response = self
            .client
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .json(&CreateSessionRequest {
                identifier: &self.identifier,
                password: self.password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| map_transport_error(e, "create session"))?;

        let status = response.status();
        if !status.is_success() {
            let body: XrpcError = response.json().await.unwrap_or_default();
            return Err(map_xrpc_error(status.as_u16(), &body, "create session"));
        }

        response.json().await.map_err(|e| {
            PlatformError::Authentication(format!(
                "Bluesky returned an unexpected session payload: {}",
                e
            ))
        })
    }
}

#[async_trait]
impl Platform for BlueskyPlatform {
    async fn publish(&self, content: &str) -> PlatformResult<PostReference> {
        self.validate_content(content)?;

        let session = self.create_session().await?;
        debug!(did = %session.did, "Bluesky session created");

        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text: content,
                created_at: chrono::Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                langs: ["en"],
            },
        };

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "create record"))?;

        let status = response.status();
        if !status.is_success() {
            let body: XrpcError = response.json().await.unwrap_or_default();
            return Err(map_xrpc_error(status.as_u16(), &body, "create record"));
        }

        let created: CreateRecordResponse = response.json().await.map_err(|e| {
            PlatformError::Posting(format!("Bluesky returned an unexpected record payload: {}", e))
        })?;

        debug!(uri = %created.uri, "Bluesky record created");

        Ok(PostReference {
            platform: "bluesky".to_string(),
            url: permalink(&created.uri),
            id: created.uri,
        })
    }

    fn name(&self) -> &str {
        "bluesky"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }
}

/// Convert `at://{did}/app.bsky.feed.post/{rkey}` into a bsky.app link
pub fn permalink(at_uri: &str) -> Option<String> {
    static AT_URI: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = AT_URI
        .get_or_init(|| Regex::new(r"^at://([A-Za-z0-9:._-]+)/[a-z.]+/([A-Za-z0-9]+)$").ok())
        .as_ref()?;

    let captures = pattern.captures(at_uri)?;
    Some(format!(
        "https://bsky.app/profile/{}/post/{}",
        &captures[1], &captures[2]
    ))
}

fn map_transport_error(error: reqwest::Error, context: &str) -> PlatformError {
    PlatformError::Network(format!("Bluesky unreachable ({}): {}", context, error))
}

/// Classify an XRPC error response
///
/// Session and token errors come back as 400 or 401 with a named `error`,
/// so the name is checked before the status.
fn map_xrpc_error(status: u16, body: &XrpcError, context: &str) -> PlatformError {
    let detail = if body.message.is_empty() {
        body.error.clone()
    } else {
        format!("{}: {}", body.error, body.message)
    };

    match (status, body.error.as_str()) {
        (_, "AuthenticationRequired" | "ExpiredToken" | "InvalidToken" | "AccountTakedown")
        | (401 | 403, _) => PlatformError::Authentication(format!(
            "Bluesky authentication failed ({}): {}",
            context, detail
        )),
        (429, _) | (_, "RateLimitExceeded") => PlatformError::RateLimit(format!(
            "Bluesky rate limit exceeded ({}): {}",
            context, detail
        )),
        (400, _) => PlatformError::Validation(format!(
            "Bluesky rejected the request ({}): {}",
            context, detail
        )),
        (500..=599, _) => PlatformError::Network(format!(
            "Bluesky server error {} ({}): {}",
            status, context, detail
        )),
        _ => PlatformError::Posting(format!(
            "Bluesky request failed with status {} ({}): {}",
            status, context, detail
        )),
    }
}
