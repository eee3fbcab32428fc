use chrono::{Local, Utc};

use crate::{config::Config, info, management::CredentialStore, success, warning};

pub async fn status(config: &Config) {
    let store = CredentialStore::new(config.token_path.clone());

    match store.load().await {
        Ok(Some(bundle)) if bundle.is_valid_at(Utc::now()) => success!(
            "Access token valid until {}",
            bundle.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        Ok(Some(bundle)) => warning!(
            "Access token expired at {}; it will be refreshed on next use.",
            bundle.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        Ok(None) => warning!("Not authenticated. Run spotify-history auth."),
        Err(e) => warning!("Stored credentials are unusable: {}", e),
    }

    info!("Credentials: {}", store.path().display());
    info!("History file: {}", config.data_path.display());
    info!("Log file: {}", config.log_path.display());
}
