use crate::{
    cli,
    config::Config,
    error, logging,
    management::{HistoryCollector, HistoryStore},
    spotify::SpotifyPlayerClient,
};

/// Collects listening history until interrupted.
///
/// Startup needs valid credentials (running the login if necessary); failing
/// that is fatal. Once the loop runs, errors are logged and retried.
pub async fn collect(config: &Config, background: bool) {
    let _guard = match logging::init_logging(&config.log_path, background) {
        Ok(guard) => guard,
        Err(e) => error!("Cannot set up logging. Err: {}", e),
    };

    let authenticator = cli::build_authenticator(config);
    if let Err(e) = authenticator.get_valid_credentials().await {
        error!("Authentication failed: {}", e);
    }

    let store = HistoryStore::new(config.data_path.clone());
    if let Err(e) = store.initialize().await {
        error!(
            "Cannot create history file {}. Err: {}",
            store.path().display(),
            e
        );
    }
    tracing::info!("Writing listening history to {}", store.path().display());

    let mut collector =
        HistoryCollector::new(authenticator, SpotifyPlayerClient::new(config), store, config);

    tokio::select! {
        _ = collector.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping collector");
        }
    }
}
