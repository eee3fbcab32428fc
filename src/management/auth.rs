use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::AuthError,
    management::CredentialStore,
    server::CallbackListener,
    spotify::TokenEndpoint,
    types::{CallbackOutcome, CredentialBundle, PkceChallenge},
    utils, warning,
};

/// Hands out access tokens to the collector.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns credentials whose access token has not expired yet.
    async fn get_valid_credentials(&self) -> Result<CredentialBundle, AuthError>;

    /// Obtains a new access token regardless of the stored expiry. Used after
    /// the API rejected a token the store still considers valid.
    async fn force_refresh(&self) -> Result<CredentialBundle, AuthError>;
}

/// Where the user completes the authorization step.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str);
}

/// Opens the authorization URL in the default browser, falling back to
/// printing it for manual navigation.
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) {
        if webbrowser::open(url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                url
            )
        }
    }
}

#[derive(Debug, Clone)]
struct LoginSettings {
    client_id: String,
    auth_url: String,
    redirect_uri: String,
    callback_addr: SocketAddr,
    timeout: Duration,
}

/// Owns the credential lifecycle: load, refresh and the full PKCE login.
pub struct Authenticator {
    store: CredentialStore,
    tokens: Arc<dyn TokenEndpoint>,
    browser: Arc<dyn Browser>,
    settings: LoginSettings,
    login_lock: Mutex<()>,
}

impl Authenticator {
    pub fn new(
        config: &Config,
        store: CredentialStore,
        tokens: Arc<dyn TokenEndpoint>,
        browser: Arc<dyn Browser>,
    ) -> Self {
        Self {
            store,
            tokens,
            browser,
            settings: LoginSettings {
                client_id: config.client_id.clone(),
                auth_url: config.auth_url.clone(),
                redirect_uri: config.redirect_uri.clone(),
                callback_addr: config.callback_addr,
                timeout: config.login_timeout,
            },
            login_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn login_timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Returns valid credentials, refreshing or logging in as needed.
    ///
    /// A stored bundle that has not expired is returned without any network
    /// call. An expired one is refreshed; when the refresh fails the full login
    /// runs. Only a failed login is reported as an error.
    pub async fn get_valid_credentials(&self) -> Result<CredentialBundle, AuthError> {
        let stored = self.load_stored().await;

        if let Some(bundle) = &stored {
            if bundle.is_valid_at(Utc::now()) {
                return Ok(bundle.clone());
            }
            debug!("Access token expired at {}", bundle.expires_at);
        }

        self.refresh_or_login(stored).await
    }

    pub async fn force_refresh(&self) -> Result<CredentialBundle, AuthError> {
        let stored = self.load_stored().await;
        self.refresh_or_login(stored).await
    }

    /// Runs the interactive PKCE login and persists the new credentials.
    ///
    /// Only one login may be in flight per authenticator; a second call while
    /// one is pending fails with [`AuthError::LoginInProgress`].
    pub async fn login(&self) -> Result<CredentialBundle, AuthError> {
        let _attempt = self
            .login_lock
            .try_lock()
            .map_err(|_| AuthError::LoginInProgress)?;

        let pkce = PkceChallenge::generate();
        let auth_url = utils::build_authorize_url(
            &self.settings.auth_url,
            &self.settings.client_id,
            &self.settings.redirect_uri,
            &pkce.challenge,
        )?;

        let listener = CallbackListener::bind(self.settings.callback_addr).await?;

        info!(
            "Waiting up to {}s for the Spotify login to complete",
            self.settings.timeout.as_secs()
        );
        self.browser.open(auth_url.as_str());

        match listener.await_outcome(self.settings.timeout).await? {
            CallbackOutcome::AuthorizationCode(code) => {
                let response = self
                    .tokens
                    .exchange_code_pkce(&code, &pkce.verifier)
                    .await?;
                let bundle = CredentialBundle::from_response(response, None, Utc::now())?;

                self.store.persist(&bundle).await?;
                info!("Stored new credentials in {}", self.store.path().display());
                Ok(bundle)
            }
            CallbackOutcome::AuthorizationError(reason) => Err(AuthError::Denied(reason)),
            CallbackOutcome::Pending => Err(AuthError::Timeout),
        }
    }

    async fn refresh_or_login(
        &self,
        stored: Option<CredentialBundle>,
    ) -> Result<CredentialBundle, AuthError> {
        if let Some(bundle) = stored {
            match self.refresh(&bundle).await {
                Ok(refreshed) => return Ok(refreshed),
                Err(e) => warn!("Token refresh failed, starting a new login: {}", e),
            }
        }

        self.login().await
    }

    async fn refresh(&self, bundle: &CredentialBundle) -> Result<CredentialBundle, AuthError> {
        let response = self.tokens.refresh_token(&bundle.refresh_token).await?;
        let refreshed =
            CredentialBundle::from_response(response, Some(&bundle.refresh_token), Utc::now())?;

        self.store.persist(&refreshed).await?;
        info!("Refreshed access token, valid until {}", refreshed.expires_at);
        Ok(refreshed)
    }

    /// Loads the stored bundle. An unreadable file counts as no bundle, which
    /// leads to a fresh login that overwrites it.
    async fn load_stored(&self) -> Option<CredentialBundle> {
        match self.store.load().await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Ignoring stored credentials: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl CredentialProvider for Authenticator {
    async fn get_valid_credentials(&self) -> Result<CredentialBundle, AuthError> {
        Authenticator::get_valid_credentials(self).await
    }

    async fn force_refresh(&self) -> Result<CredentialBundle, AuthError> {
        Authenticator::force_refresh(self).await
    }
}
