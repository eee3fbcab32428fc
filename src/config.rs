//! Configuration management for the listening history collector.
//!
//! Values come from three places, highest priority first:
//! 1. Process environment variables
//! 2. A `.env` file in the local data directory (`<data_local_dir>/spotify-history/.env`)
//! 3. Built-in defaults
//!
//! Everything is resolved once into a [`Config`] which is then handed to the
//! components that need it. Nothing below reads the environment on its own.

use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use crate::error::ConfigError;

/// Directory name used below the platform data directory.
pub const APP_DIR: &str = "spotify-history";

/// Public client id of the registered Spotify application. PKCE clients carry
/// no secret, so shipping the id in the binary is fine.
pub const DEFAULT_CLIENT_ID: &str = "2e98209a9de244a389f1d0ba1711f6a9";

/// Scopes requested during authorization.
pub const SCOPES: &str = "user-read-currently-playing user-read-recently-played";

const DEFAULT_CALLBACK_ADDR: &str = "127.0.0.1:8888";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_ERROR_BACKOFF_SECS: u64 = 60;
const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 60;

/// Loads environment variables from the `.env` file in the local data directory.
///
/// Creates the directory when it is missing. A missing `.env` file is not an
/// error; every key has a default.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/spotify-history/.env`
/// - macOS: `~/Library/Application Support/spotify-history/.env`
/// - Windows: `%LOCALAPPDATA%/spotify-history/.env`
pub async fn load_env() -> Result<(), String> {
    let mut path = data_dir();
    path.push(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("{}: {}", path.display(), e)),
    }
}

/// Returns the application directory below the platform local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Address the callback listener binds to.
    pub callback_addr: SocketAddr,
    /// Redirect URI registered with Spotify. Must point at `callback_addr`.
    pub redirect_uri: String,
    pub token_path: PathBuf,
    pub data_path: PathBuf,
    pub log_path: PathBuf,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub login_timeout: Duration,
}

impl Config {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), data_dir())
    }

    /// Builds the configuration from an arbitrary key lookup, rooting default
    /// file locations at `base_dir`.
    pub fn from_lookup<F>(lookup: F, base_dir: PathBuf) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let path = |key: &str, default: PathBuf| -> PathBuf {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let callback_addr: SocketAddr = get("SPOTIFY_HISTORY_CALLBACK_ADDR", DEFAULT_CALLBACK_ADDR)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "SPOTIFY_HISTORY_CALLBACK_ADDR",
                reason: e.to_string(),
            })?;

        let redirect_uri = get(
            "SPOTIFY_HISTORY_REDIRECT_URI",
            &format!("http://localhost:{}/callback", callback_addr.port()),
        );

        Ok(Self {
            client_id: get("SPOTIFY_CLIENT_ID", DEFAULT_CLIENT_ID),
            auth_url: get("SPOTIFY_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: get("SPOTIFY_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: get("SPOTIFY_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            callback_addr,
            redirect_uri,
            token_path: path(
                "SPOTIFY_HISTORY_TOKEN_PATH",
                base_dir.join("cache").join("token.json"),
            ),
            data_path: path(
                "SPOTIFY_HISTORY_DATA_PATH",
                base_dir.join("data").join("listen_history.csv"),
            ),
            log_path: path(
                "SPOTIFY_HISTORY_LOG_PATH",
                base_dir.join("logs").join("listen_history.log"),
            ),
            poll_interval: seconds(
                &lookup,
                "SPOTIFY_HISTORY_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?,
            error_backoff: seconds(
                &lookup,
                "SPOTIFY_HISTORY_ERROR_BACKOFF_SECS",
                DEFAULT_ERROR_BACKOFF_SECS,
            )?,
            login_timeout: seconds(
                &lookup,
                "SPOTIFY_HISTORY_LOGIN_TIMEOUT_SECS",
                DEFAULT_LOGIN_TIMEOUT_SECS,
            )?,
        })
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })?,
        None => default,
    };

    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned(), PathBuf::from("/tmp/sh"))
    }

    #[test]
    fn test_defaults() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(config.callback_addr.port(), 8888);
        assert_eq!(config.redirect_uri, "http://localhost:8888/callback");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.error_backoff, Duration::from_secs(60));
        assert_eq!(config.login_timeout, Duration::from_secs(60));
        assert_eq!(config.token_path, PathBuf::from("/tmp/sh/cache/token.json"));
        assert_eq!(
            config.data_path,
            PathBuf::from("/tmp/sh/data/listen_history.csv")
        );
    }

    #[test]
    fn test_redirect_uri_follows_callback_port() {
        let config = config_with(&[("SPOTIFY_HISTORY_CALLBACK_ADDR", "127.0.0.1:9999")]).unwrap();
        assert_eq!(config.redirect_uri, "http://localhost:9999/callback");
    }

    #[test]
    fn test_overrides() {
        let config = config_with(&[
            ("SPOTIFY_CLIENT_ID", "my-client"),
            ("SPOTIFY_API_URL", "http://127.0.0.1:1234/v1/"),
            ("SPOTIFY_HISTORY_POLL_INTERVAL_SECS", "5"),
            ("SPOTIFY_HISTORY_TOKEN_PATH", "/elsewhere/token.json"),
        ])
        .unwrap();

        assert_eq!(config.client_id, "my-client");
        assert_eq!(config.api_url, "http://127.0.0.1:1234/v1");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.token_path, PathBuf::from("/elsewhere/token.json"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            config_with(&[("SPOTIFY_HISTORY_CALLBACK_ADDR", "not-an-addr")]),
            Err(ConfigError::Invalid { key: "SPOTIFY_HISTORY_CALLBACK_ADDR", .. })
        ));
        assert!(matches!(
            config_with(&[("SPOTIFY_HISTORY_POLL_INTERVAL_SECS", "soon")]),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            config_with(&[("SPOTIFY_HISTORY_ERROR_BACKOFF_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
