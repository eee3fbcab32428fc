//! Spotify Listening History Library
//!
//! This library records a user's Spotify listening history. It signs in through
//! the OAuth 2.0 Authorization Code flow with PKCE, keeps the resulting
//! credentials fresh, polls the "currently playing" endpoint and appends every
//! track change to a CSV history file. A small statistics module summarizes the
//! collected history for the command line.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the local OAuth callback listener
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration loaded from the environment and `.env` files
//! - `error` - Error types shared across the crate
//! - `logging` - Tracing subscriber setup for the collector
//! - `management` - Credential storage, authentication, collection and statistics
//! - `server` - Short-lived local HTTP listener for the OAuth redirect
//! - `spotify` - Spotify Web API and token endpoint clients
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE and URL helpers

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for command-level operations that may fail.
///
/// Library components return their own error types; the CLI layer collapses
/// them into this boxed form before reporting them to the user.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Opening browser for Spotify authentication...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Terminates the process with exit code 1. Only the command layer uses this,
/// for failures where there is no unattended fallback.
///
/// # Example
///
/// ```
/// error!("Authentication failed: {}", err);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
