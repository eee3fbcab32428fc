use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::{error::StoreError, types::PlaybackObservation};

/// Column order of the history file.
pub const HISTORY_COLUMNS: [&str; 7] = [
    "timestamp",
    "track_id",
    "track_name",
    "artist_name",
    "album_name",
    "duration_ms",
    "popularity",
];

/// Durable destination for observations.
#[async_trait]
pub trait ObservationSink: Send {
    async fn append(&mut self, observation: &PlaybackObservation) -> Result<(), StoreError>;
}

/// Append-only CSV listening history.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        HistoryStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with its header row if it does not exist yet.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        self.write_record(None).await
    }

    /// Appends one observation. The row is encoded up front and written with
    /// a single append, so a failed write never leaves half a row behind.
    pub async fn append(&self, observation: &PlaybackObservation) -> Result<(), StoreError> {
        self.write_record(Some(observation)).await
    }

    /// Reads every stored observation in write order.
    pub async fn load(&self) -> Result<Vec<PlaybackObservation>, StoreError> {
        let content = match async_fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::Reader::from_reader(content.as_slice());
        reader
            .deserialize::<PlaybackObservation>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn write_record(&self, observation: Option<&PlaybackObservation>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let needs_header = file.metadata().await?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if needs_header {
            writer.write_record(HISTORY_COLUMNS)?;
        }
        if let Some(observation) = observation {
            writer.serialize(observation)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        if !bytes.is_empty() {
            file.write_all(&bytes).await?;
            file.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObservationSink for HistoryStore {
    async fn append(&mut self, observation: &PlaybackObservation) -> Result<(), StoreError> {
        HistoryStore::append(self, observation).await
    }
}
