use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    config::Config,
    error::PollError,
    types::{CurrentlyPlayingResponse, PlayingItem},
};

/// Source of "currently playing" samples.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// Returns the playing item, or `None` when nothing is playing.
    async fn currently_playing(&self, access_token: &str)
    -> Result<Option<PlayingItem>, PollError>;
}

pub struct SpotifyPlayerClient {
    client: Client,
    api_url: String,
}

impl SpotifyPlayerClient {
    pub fn new(config: &Config) -> Self {
        Self::with_client(super::http_client(), config)
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
        }
    }
}

#[async_trait]
impl PlaybackSource for SpotifyPlayerClient {
    async fn currently_playing(
        &self,
        access_token: &str,
    ) -> Result<Option<PlayingItem>, PollError> {
        let api_url = format!("{uri}/me/player/currently-playing", uri = &self.api_url);

        let res = self
            .client
            .get(&api_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        match res.status() {
            // nothing is playing
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::UNAUTHORIZED => Err(PollError::Unauthorized),
            status if status.is_success() => {
                let body = res.json::<CurrentlyPlayingResponse>().await?;
                Ok(body.item)
            }
            status => Err(PollError::Status {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            }),
        }
    }
}
