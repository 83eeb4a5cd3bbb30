//! On-disk token cache
//!
//! A single JSON file with exactly two time-bounded entries:
//!
//! ```json
//! {
//!   "access_token":  { "value": "...", "expires": 1700000000000 },
//!   "refresh_token": { "value": "...", "expires": 1700000000000 }
//! }
//! ```
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so overlapping runs are last-write-wins and a reader never
//! observes half a record.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Access and refresh token pair with the expiry reported by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at_millis: i64,
}

impl TokenRecord {
    pub fn from_exchange(
        access_token: String,
        refresh_token: String,
        expires_in_secs: u64,
        now_millis: i64,
    ) -> Self {
        let lifetime = i64::try_from(expires_in_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        Self {
            access_token,
            refresh_token,
            expires_at_millis: now_millis.saturating_add(lifetime),
        }
    }

    /// Whether the access token can still be used `skew_millis` from now
    pub fn access_valid_at(&self, now_millis: i64, skew_millis: i64) -> bool {
        !self.access_token.is_empty() && now_millis.saturating_add(skew_millis) < self.expires_at_millis
    }

    /// Refresh tokens stay usable past expiry until upstream rejects them
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    value: String,
    expires: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    access_token: Option<StoredEntry>,
    refresh_token: Option<StoredEntry>,
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored pair
    ///
    /// A missing file, a file holding only one of the two entries, or an
    /// unreadable document all mean "no record"; the next exchange rewrites it.
    pub fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No token store at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file: StoreFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "Ignoring unreadable token store {}: {}",
                    self.path.display(),
                    e
                );
                return Ok(None);
            }
        };

        match (file.access_token, file.refresh_token) {
            (Some(access), Some(refresh)) => Ok(Some(TokenRecord {
                access_token: access.value,
                refresh_token: refresh.value,
                expires_at_millis: access.expires,
            })),
            _ => Ok(None),
        }
    }

    /// Replace both entries in one rename
    pub fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let file = StoreFile {
            access_token: Some(StoredEntry {
                value: record.access_token.clone(),
                expires: record.expires_at_millis,
            }),
            refresh_token: Some(StoredEntry {
                value: record.refresh_token.clone(),
                expires: record.expires_at_millis,
            }),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Stored token pair in {}", self.path.display());
        Ok(())
    }
}
