//! # Spotify Integration Module
//!
//! Clients for the two Spotify services the collector talks to:
//!
//! - [`auth`] - The accounts token endpoint, for the `authorization_code` and
//!   `refresh_token` grants of the PKCE flow.
//! - [`player`] - The Web API "currently playing" endpoint.
//!
//! Each client sits behind a small trait ([`TokenEndpoint`], [`PlaybackSource`])
//! so the authenticator and collector can be driven by in-memory fakes in tests.
//! Neither client retries on its own; retry policy belongs to the collector loop.

use std::time::Duration;

use reqwest::Client;

pub mod auth;
pub mod player;

pub use auth::{SpotifyTokenClient, TokenEndpoint};
pub use player::{PlaybackSource, SpotifyPlayerClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client shared by the Spotify clients.
pub fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}
