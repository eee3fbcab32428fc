//! # CLI Module
//!
//! Command implementations for the `spotify-history` binary. Each command
//! builds the components it needs from the resolved [`Config`], runs them and
//! turns failures into user-facing messages.
//!
//! - [`auth`] - Interactive Spotify login; exits non-zero when it fails
//! - [`collect`] - Long-running listening history collector
//! - [`stats`] - Aggregate statistics over the collected history
//! - [`history`] - Paged list of collected plays, newest first
//! - [`status`] - Credential and history file status, without network calls
//!
//! Fatal problems are reported with the crate's `error!` macro, which exits
//! with status 1. Everything the collector encounters while running is logged
//! and retried instead.

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    management::{Authenticator, CredentialStore, SystemBrowser},
    spotify::SpotifyTokenClient,
};

mod auth;
mod collect;
mod stats;
mod status;

pub use auth::auth;
pub use collect::collect;
pub use stats::history;
pub use stats::stats;
pub use status::status;

fn build_authenticator(config: &Config) -> Authenticator {
    Authenticator::new(
        config,
        CredentialStore::new(config.token_path.clone()),
        Arc::new(SpotifyTokenClient::new(config)),
        Arc::new(SystemBrowser),
    )
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
