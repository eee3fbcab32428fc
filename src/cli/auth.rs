use crate::{cli, config::Config, error, info, success};

/// Runs the full login even when stored credentials are still valid.
pub async fn auth(config: &Config) {
    let authenticator = cli::build_authenticator(config);

    info!("Opening browser for Spotify authentication...");
    info!(
        "Please log in and approve the permissions request within {} seconds.",
        authenticator.login_timeout().as_secs()
    );

    let pb = cli::spinner("Waiting for Spotify authorization...");
    let result = authenticator.login().await;
    pb.finish_and_clear();

    match result {
        Ok(_) => success!(
            "Authentication successful! Tokens saved to {}",
            authenticator.store().path().display()
        ),
        Err(e) => error!("Authentication failed: {}", e),
    }
}
