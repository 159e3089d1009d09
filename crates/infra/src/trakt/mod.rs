//! Trakt HTTP adapters
//!
//! - [`ApiTransport`]: builds and sends JSON requests, optionally signed
//! - [`TraktOAuthClient`]: unsigned OAuth endpoints for the token manager
//! - [`TraktApiClient`]: authenticated calls that check the token first

pub mod client;
pub mod oauth;
pub mod transport;

pub use client::TraktApiClient;
pub use oauth::TraktOAuthClient;
pub use transport::{ApiTransport, RequestParameters};
