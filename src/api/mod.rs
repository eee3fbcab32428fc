//! # API Module
//!
//! HTTP handlers served by the local callback listener during a login attempt.
//!
//! - [`callback`] - Receives the OAuth redirect from Spotify's authorization
//!   server and records either the authorization code or the error it carries.
//!
//! The listener lives only for the duration of one login attempt; see
//! [`crate::server`] for how it is started and torn down.

mod callback;

pub use callback::callback;
