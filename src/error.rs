//! Error types for configuration, authentication, polling and storage.
//!
//! The variants follow the failure kinds the collector distinguishes:
//! a login that timed out or was denied, a token endpoint that refused an
//! exchange, and transient failures while sampling playback or writing an
//! observation. Authentication failures are fatal for an explicit `auth`
//! command but only transient inside the collector loop.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("authentication timed out")]
    Timeout,

    #[error("authorization denied: {0}")]
    Denied(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("callback listener error: {0}")]
    Listener(#[from] io::Error),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("a login attempt is already in progress")]
    LoginInProgress,

    #[error("invalid authorization URL: {0}")]
    AuthorizeUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::TokenExchange(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("access token rejected (unauthorized)")]
    Unauthorized,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A failed collector iteration. Always transient: the loop logs it and backs off.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("could not obtain credentials: {0}")]
    Auth(#[from] AuthError),

    #[error("could not sample playback: {0}")]
    Poll(#[from] PollError),

    #[error("could not write observation: {0}")]
    Store(#[from] StoreError),
}
