use chrono::{Local, Utc};
use tabled::Table;

use crate::{
    config::Config,
    error, info,
    management::{
        HistoryStore,
        stats::{self, Period, Ranked},
    },
    types::{HistoryTableRow, HourTableRow, PlaybackObservation, RankingTableRow},
    warning,
};

const HISTORY_PAGE_SIZE: usize = 50;
const ACTIVITY_BAR_WIDTH: usize = 30;

pub async fn stats(config: &Config, period: Period, top: usize) {
    let Some(records) = load_history(config).await else {
        return;
    };

    let summary = stats::compute_stats(&records, period, Utc::now(), top, &Local);
    if summary.total_plays == 0 {
        warning!("No plays recorded in the selected period.");
        return;
    }

    info!(
        "Plays: {}\tUnique tracks: {}\tListening time: {:.1} h",
        summary.total_plays, summary.unique_tracks, summary.total_hours
    );

    print_ranking("Top artists", &summary.top_artists);
    print_ranking("Top tracks", &summary.top_tracks);
    print_ranking("Top albums", &summary.top_albums);

    let busiest = summary.hourly.iter().copied().max().unwrap_or(0).max(1);
    let rows: Vec<HourTableRow> = summary
        .hourly
        .iter()
        .enumerate()
        .map(|(hour, &plays)| HourTableRow {
            hour: format!("{:02}:00", hour),
            plays,
            activity: "#".repeat(plays * ACTIVITY_BAR_WIDTH / busiest),
        })
        .collect();
    println!("Listening activity by hour\n{}\n", Table::new(rows));
}

pub async fn history(config: &Config, page: usize) {
    let Some(records) = load_history(config).await else {
        return;
    };

    let (items, total_pages) = stats::history_page(&records, page, HISTORY_PAGE_SIZE);
    if items.is_empty() {
        warning!("Page {} is out of range (1-{}).", page, total_pages);
        return;
    }

    let rows: Vec<HistoryTableRow> = items
        .into_iter()
        .map(|r| HistoryTableRow {
            played_at: r
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            track: r.track_name.clone(),
            artist: r.artist_name.clone(),
            album: r.album_name.clone(),
        })
        .collect();

    println!("{}", Table::new(rows));
    info!("Page {} of {}", page, total_pages);
}

async fn load_history(config: &Config) -> Option<Vec<PlaybackObservation>> {
    let store = HistoryStore::new(config.data_path.clone());
    let records = match store.load().await {
        Ok(records) => records,
        Err(e) => error!(
            "Cannot read listening history from {}. Err: {}",
            store.path().display(),
            e
        ),
    };

    if records.is_empty() {
        warning!("No listening history yet. Run spotify-history collect first.");
        return None;
    }
    Some(records)
}

fn print_ranking(title: &str, ranked: &[Ranked]) {
    let rows: Vec<RankingTableRow> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| RankingTableRow {
            rank: i + 1,
            name: r.name.clone(),
            plays: r.plays,
        })
        .collect();
    println!("{}\n{}\n", title, Table::new(rows));
}
