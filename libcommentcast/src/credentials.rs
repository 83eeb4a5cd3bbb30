//! Environment-supplied credentials
//!
//! Every secret comes from the process environment (a `.env` file in the
//! working directory is honoured). Missing values are reported before any
//! network work starts.

use secrecy::SecretString;

use crate::error::{ConfigError, Result};

pub const SOUNDCLOUD_CLIENT_ID: &str = "SOUNDCLOUD_CLIENT_ID";
pub const SOUNDCLOUD_SECRET: &str = "SOUNDCLOUD_SECRET";
pub const GOOGLE_TRANSLATE_API_KEY: &str = "GOOGLE_TRANSLATE_API_KEY";
pub const MASTODON_ACCESS_TOKEN: &str = "MASTODON_ACCESS_TOKEN";
pub const BLUESKY_USERNAME: &str = "BLUESKY_USERNAME";
pub const BLUESKY_PASSWORD: &str = "BLUESKY_PASSWORD";

pub struct SoundCloudCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

pub struct BlueskyCredentials {
    pub identifier: String,
    pub password: SecretString,
}

pub struct Credentials {
    pub soundcloud: SoundCloudCredentials,
    pub translate_api_key: SecretString,
    pub mastodon_access_token: Option<SecretString>,
    pub bluesky: Option<BlueskyCredentials>,
}

impl Credentials {
    /// Read credentials from the environment
    ///
    /// `platforms` lists the publishers that will run; their credentials become
    /// mandatory while the others are ignored.
    pub fn from_env(platforms: &[String]) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok(), platforms)
    }

    /// Build credentials from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F, platforms: &[String]) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential(key.to_string()).into())
        };
        let wants = |name: &str| platforms.iter().any(|p| p == name);

        let soundcloud = SoundCloudCredentials {
            client_id: required(SOUNDCLOUD_CLIENT_ID)?,
            client_secret: SecretString::from(required(SOUNDCLOUD_SECRET)?),
        };
        let translate_api_key = SecretString::from(required(GOOGLE_TRANSLATE_API_KEY)?);

        let mastodon_access_token = if wants("mastodon") {
            Some(SecretString::from(required(MASTODON_ACCESS_TOKEN)?))
        } else {
            None
        };

        let bluesky = if wants("bluesky") {
            Some(BlueskyCredentials {
                identifier: required(BLUESKY_USERNAME)?,
                password: SecretString::from(required(BLUESKY_PASSWORD)?),
            })
        } else {
            None
        };

        Ok(Self {
            soundcloud,
            translate_api_key,
            mastodon_access_token,
            bluesky,
        })
    }
}
