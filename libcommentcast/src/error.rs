//! Error types for Commentcast

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommentcastError>;

#[derive(Error, Debug)]
pub enum CommentcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    #[error("Comment selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CommentcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CommentcastError::InvalidInput(_) => 3,
            CommentcastError::Config(_) => 3,
            CommentcastError::Token(TokenError::UpstreamRejected { .. }) => 2,
            CommentcastError::Selection(SelectionError::AuthFailed(_)) => 2,
            CommentcastError::Platform(PlatformError::Authentication(_)) => 2,
            CommentcastError::Token(_) => 1,
            CommentcastError::Store(_) => 1,
            CommentcastError::Selection(_) => 1,
            CommentcastError::Platform(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Missing required credential: {0} is not set")]
    MissingCredential(String),

    #[error("Invalid denylist pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Token store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token store encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures while obtaining an upstream access token
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token endpoint answered with a non-success status. Terminal for the run.
    #[error("Token endpoint rejected the {grant} exchange with status {status}")]
    UpstreamRejected { grant: &'static str, status: u16 },

    #[error("Token endpoint unreachable: {0}")]
    Network(String),

    #[error("Token endpoint returned an unexpected payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TokenError {
    /// Whether this failure must stop the selection loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenError::UpstreamRejected { .. })
    }
}

/// Failures of a single candidate fetch. Only `Token` with a terminal cause is fatal.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No track exists at ID {0}")]
    NotFound(u64),

    #[error("Not authorized to read track {0}")]
    Unauthorized(u64),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Track {0} has no comments")]
    NoComments(u64),

    #[error("Request failed: {0}")]
    Network(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Error, Debug, Clone)]
pub enum DetectError {
    #[error("Language detection request failed: {0}")]
    Network(String),

    #[error("Language detection rejected with status {0}")]
    Rejected(u16),

    #[error("Language detection returned an unexpected payload: {0}")]
    Malformed(String),
}

#[derive(Error, Debug, Clone)]
pub enum SelectionError {
    #[error("Upstream authentication failed: {0}")]
    AuthFailed(String),

    #[error("No usable comment found after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("No usable comment found within {} ({attempts} attempts)", format_elapsed(.elapsed))]
    DeadlineExceeded { attempts: u32, elapsed: Duration },
}

fn format_elapsed(elapsed: &Duration) -> String {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = CommentcastError::InvalidInput("Unknown platform".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = CommentcastError::Config(ConfigError::MissingCredential(
            "SOUNDCLOUD_CLIENT_ID".to_string(),
        ));
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_failures() {
        let rejected = CommentcastError::Token(TokenError::UpstreamRejected {
            grant: "client_credentials",
            status: 401,
        });
        assert_eq!(rejected.exit_code(), 2);

        let selection = CommentcastError::Selection(SelectionError::AuthFailed("bad".to_string()));
        assert_eq!(selection.exit_code(), 2);

        let platform =
            CommentcastError::Platform(PlatformError::Authentication("expired".to_string()));
        assert_eq!(platform.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_generic_failures() {
        let exhausted = CommentcastError::Selection(SelectionError::Exhausted { attempts: 50 });
        assert_eq!(exhausted.exit_code(), 1);

        let network = CommentcastError::Token(TokenError::Network("timeout".to_string()));
        assert_eq!(network.exit_code(), 1);

        let posting = CommentcastError::Platform(PlatformError::Posting("boom".to_string()));
        assert_eq!(posting.exit_code(), 1);
    }

    #[test]
    fn test_token_error_terminality() {
        assert!(TokenError::UpstreamRejected {
            grant: "refresh_token",
            status: 400
        }
        .is_terminal());
        assert!(!TokenError::Network("reset".to_string()).is_terminal());
        assert!(!TokenError::Malformed("no access_token".to_string()).is_terminal());
    }

    #[test]
    fn test_error_message_formatting_selection() {
        let error = CommentcastError::Selection(SelectionError::Exhausted { attempts: 7 });
        assert_eq!(
            error.to_string(),
            "Comment selection failed: No usable comment found after 7 attempts"
        );

        let deadline = SelectionError::DeadlineExceeded {
            attempts: 3,
            elapsed: Duration::from_secs(90),
        };
        assert_eq!(
            deadline.to_string(),
            "No usable comment found within 1m 30s (3 attempts)"
        );
    }

    #[test]
    fn test_error_message_formatting_token() {
        let error = TokenError::UpstreamRejected {
            grant: "refresh_token",
            status: 401,
        };
        assert_eq!(
            error.to_string(),
            "Token endpoint rejected the refresh_token exchange with status 401"
        );
    }

    #[test]
    fn test_source_error_wraps_token_error_transparently() {
        let error: SourceError = TokenError::Network("connection refused".to_string()).into();
        assert_eq!(error.to_string(), "Token endpoint unreachable: connection refused");
    }

    #[test]
    fn test_error_conversion_from_platform_error() {
        let platform_error = PlatformError::Posting("test".to_string());
        let error: CommentcastError = platform_error.into();
        assert!(matches!(error, CommentcastError::Platform(_)));
    }

    #[test]
    fn test_invalid_pattern_formatting() {
        let error = ConfigError::InvalidPattern {
            pattern: "(unclosed".to_string(),
            reason: "unclosed group".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("(unclosed"));
        assert!(message.contains("unclosed group"));
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();
        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
