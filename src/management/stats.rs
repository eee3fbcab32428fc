use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use clap::ValueEnum;

use crate::types::PlaybackObservation;

/// Time window a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    /// Last 30 days
    Month,
    /// Last 365 days
    Year,
    /// Everything collected so far
    All,
}

impl Period {
    fn start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Month => Some(now - Duration::days(30)),
            Period::Year => Some(now - Duration::days(365)),
            Period::All => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub name: String,
    pub plays: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListeningStats {
    pub total_plays: usize,
    pub unique_tracks: usize,
    pub total_hours: f64,
    pub top_artists: Vec<Ranked>,
    pub top_tracks: Vec<Ranked>,
    pub top_albums: Vec<Ranked>,
    /// Plays per hour of day, in the requested time zone.
    pub hourly: [usize; 24],
}

pub fn compute_stats<Tz: TimeZone>(
    records: &[PlaybackObservation],
    period: Period,
    now: DateTime<Utc>,
    top: usize,
    tz: &Tz,
) -> ListeningStats {
    let start = period.start(now);
    let selected: Vec<&PlaybackObservation> = records
        .iter()
        .filter(|r| start.is_none_or(|s| r.timestamp >= s))
        .collect();

    let unique_tracks = selected
        .iter()
        .map(|r| r.track_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_ms: u64 = selected.iter().map(|r| r.duration_ms).sum();

    let mut hourly = [0usize; 24];
    for r in &selected {
        hourly[r.timestamp.with_timezone(tz).hour() as usize] += 1;
    }

    ListeningStats {
        total_plays: selected.len(),
        unique_tracks,
        total_hours: total_ms as f64 / 3_600_000.0,
        top_artists: rank(selected.iter().map(|r| r.artist_name.clone()), top),
        top_tracks: rank(
            selected
                .iter()
                .map(|r| format!("{} by {}", r.track_name, r.artist_name)),
            top,
        ),
        top_albums: rank(selected.iter().map(|r| r.album_name.clone()), top),
        hourly,
    }
}

/// Counts occurrences, most played first, ties broken by name.
fn rank(names: impl Iterator<Item = String>, top: usize) -> Vec<Ranked> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }

    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(name, plays)| Ranked { name, plays })
        .collect();
    ranked.sort_by(|a, b| b.plays.cmp(&a.plays).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(top);
    ranked
}

/// Returns one page (1-based) of the history, newest first, and the page count.
pub fn history_page(
    records: &[PlaybackObservation],
    page: usize,
    per_page: usize,
) -> (Vec<&PlaybackObservation>, usize) {
    let per_page = per_page.max(1);
    let total_pages = records.len().div_ceil(per_page);

    let mut sorted: Vec<&PlaybackObservation> = records.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let skip = page.saturating_sub(1).saturating_mul(per_page);
    let items = sorted.into_iter().skip(skip).take(per_page).collect();
    (items, total_pages)
}
