use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{CollectorError, PollError},
    management::{CredentialProvider, ObservationSink},
    spotify::PlaybackSource,
    types::{PlaybackObservation, PlayingItem},
};

/// Result of a single collector iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A new track was playing and has been written.
    Recorded(PlaybackObservation),
    /// The same track as last time is still playing.
    Unchanged,
    /// Nothing is playing, or the sample could not be taken.
    NothingPlaying,
}

/// Polls "currently playing" and appends every track change.
pub struct HistoryCollector<C, P, S> {
    credentials: C,
    source: P,
    sink: S,
    last_track_id: Option<String>,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl<C, P, S> HistoryCollector<C, P, S>
where
    C: CredentialProvider,
    P: PlaybackSource,
    S: ObservationSink,
{
    pub fn new(credentials: C, source: P, sink: S, config: &Config) -> Self {
        Self {
            credentials,
            source,
            sink,
            last_track_id: None,
            poll_interval: config.poll_interval,
            error_backoff: config.error_backoff,
        }
    }

    pub fn last_track_id(&self) -> Option<&str> {
        self.last_track_id.as_deref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs until the surrounding task is dropped. Failed iterations are
    /// logged and followed by the longer backoff sleep.
    pub async fn run(&mut self) {
        info!("Starting Spotify History Collector");

        loop {
            let delay = match self.poll_once().await {
                Ok(_) => self.poll_interval,
                Err(e) => {
                    error!("Error in collector loop: {}", e);
                    self.error_backoff
                }
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// One iteration: fetch credentials, sample playback, write on change.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, CollectorError> {
        let Some(item) = self.sample().await? else {
            return Ok(PollOutcome::NothingPlaying);
        };

        let Some(observation) = PlaybackObservation::from_item(&item, Utc::now()) else {
            debug!("Playing item '{}' has no track id, skipping", item.name);
            return Ok(PollOutcome::NothingPlaying);
        };

        if self.last_track_id.as_deref() == Some(observation.track_id.as_str()) {
            return Ok(PollOutcome::Unchanged);
        }

        self.sink.append(&observation).await?;
        info!(
            "Saved track: {} by {}",
            observation.track_name, observation.artist_name
        );
        self.last_track_id = Some(observation.track_id.clone());

        Ok(PollOutcome::Recorded(observation))
    }

    /// Samples playback once, retrying a single time with fresh credentials
    /// when the token is rejected.
    async fn sample(&self) -> Result<Option<PlayingItem>, CollectorError> {
        let credentials = self.credentials.get_valid_credentials().await?;

        match self.source.currently_playing(&credentials.access_token).await {
            Ok(item) => Ok(item),
            Err(PollError::Unauthorized) => {
                info!("Access token rejected, refreshing credentials");
                let refreshed = self.credentials.force_refresh().await?;
                Ok(self
                    .source
                    .currently_playing(&refreshed.access_token)
                    .await?)
            }
            Err(e) => {
                warn!("Error getting current track: {}", e);
                Ok(None)
            }
        }
    }
}
