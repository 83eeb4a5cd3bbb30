//! Commentcast - republish random SoundCloud comments to the social web
//!
//! One run draws random tracks until it finds a comment that survives the
//! filter chain, then posts that comment to each configured network.

pub mod config;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod http;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod selection;
pub mod service;
pub mod source;
pub mod token;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{CommentcastError, Result};
pub use service::CommentcastService;
pub use types::{PostReference, PostResult, RunReport, SelectedComment};
