use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::AuthError;

/// Renewable credentials as persisted in the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CredentialBundle {
    /// Builds a bundle from a token endpoint response. Refresh responses may
    /// omit the refresh token, in which case `previous_refresh` is kept.
    ///
    /// Fails when no refresh token is available at all, or when `expires_in`
    /// does not fit a timestamp.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| {
                AuthError::TokenExchange(
                    "token response did not include a refresh token".to_string(),
                )
            })?;

        let expires_at = i64::try_from(response.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::TokenExchange(format!("invalid expires_in: {}", response.expires_in))
            })?;

        Ok(Self {
            access_token: response.access_token,
            refresh_token,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// One-time PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

/// State of the callback listener for one login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CallbackOutcome {
    #[default]
    Pending,
    AuthorizationCode(String),
    AuthorizationError(String),
}

impl CallbackOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, CallbackOutcome::Pending)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Only `item` matters; a paused track still counts as the current track.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub item: Option<PlayingItem>,
}

/// The `item` object of the currently-playing response. Episodes and local
/// files lack some of the track fields, hence the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayingItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ItemArtist>,
    #[serde(default)]
    pub album: Option<ItemAlbum>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemAlbum {
    pub name: String,
}

/// One row of the listening history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackObservation {
    pub timestamp: DateTime<Utc>,
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub duration_ms: u64,
    pub popularity: Option<u32>,
}

impl PlaybackObservation {
    /// Returns `None` for items without a track id.
    pub fn from_item(item: &PlayingItem, timestamp: DateTime<Utc>) -> Option<Self> {
        let track_id = item.id.clone().filter(|id| !id.is_empty())?;

        Some(Self {
            timestamp,
            track_id,
            track_name: item.name.clone(),
            artist_name: item
                .artists
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            album_name: item
                .album
                .as_ref()
                .map(|a| a.name.clone())
                .unwrap_or_default(),
            duration_ms: item.duration_ms,
            popularity: item.popularity,
        })
    }
}

#[derive(Tabled)]
pub struct HistoryTableRow {
    pub played_at: String,
    pub track: String,
    pub artist: String,
    pub album: String,
}

#[derive(Tabled)]
pub struct RankingTableRow {
    pub rank: usize,
    pub name: String,
    pub plays: usize,
}

#[derive(Tabled)]
pub struct HourTableRow {
    pub hour: String,
    pub plays: usize,
    pub activity: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn response(refresh_token: Option<&str>, expires_in: u64) -> TokenResponse {
        TokenResponse {
            access_token: "t1".to_string(),
            refresh_token: refresh_token.map(str::to_string),
            expires_in,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_from_response_sets_absolute_expiry() {
        let bundle =
            CredentialBundle::from_response(response(Some("r1"), 3600), None, now()).unwrap();

        assert_eq!(bundle.refresh_token, "r1");
        assert_eq!(bundle.expires_at, now() + Duration::hours(1));
        assert!(bundle.is_valid_at(now()));
        assert!(!bundle.is_valid_at(bundle.expires_at));
    }

    #[test]
    fn test_from_response_keeps_previous_refresh_token() {
        let bundle =
            CredentialBundle::from_response(response(None, 3600), Some("old"), now()).unwrap();
        assert_eq!(bundle.refresh_token, "old");

        let rotated =
            CredentialBundle::from_response(response(Some("new"), 3600), Some("old"), now())
                .unwrap();
        assert_eq!(rotated.refresh_token, "new");
    }

    #[test]
    fn test_from_response_without_any_refresh_token() {
        let result = CredentialBundle::from_response(response(None, 3600), None, now());
        assert!(matches!(result, Err(AuthError::TokenExchange(_))));
    }

    #[test]
    fn test_from_response_rejects_out_of_range_expiry() {
        for expires_in in [100_000_000_000_000_000, i64::MAX as u64 + 1, u64::MAX] {
            let result =
                CredentialBundle::from_response(response(Some("r1"), expires_in), None, now());
            match result {
                Err(AuthError::TokenExchange(msg)) => assert!(msg.contains("invalid expires_in")),
                other => panic!("expected an invalid expiry error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_paused_item_is_still_reported() {
        let body = r#"{"is_playing": false, "item": {"id": "x", "name": "Paused"}}"#;
        let parsed: CurrentlyPlayingResponse = serde_json::from_str(body).unwrap();

        let item = parsed.item.unwrap();
        assert_eq!(item.id.as_deref(), Some("x"));
        assert_eq!(item.name, "Paused");
    }
}
