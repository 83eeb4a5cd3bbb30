//! Upstream OAuth token lifecycle
//!
//! [`TokenStore`] owns the on-disk pair, [`TokenProvider`] decides between
//! reusing, refreshing and minting.

pub mod provider;
pub mod store;

pub use provider::{AccessTokenSource, TokenProvider, EXPIRY_SKEW_MILLIS};
pub use store::{TokenRecord, TokenStore};
