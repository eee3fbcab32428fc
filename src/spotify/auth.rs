use async_trait::async_trait;
use reqwest::Client;

use crate::{config::Config, error::AuthError, types::TokenResponse};

/// The OAuth token endpoint.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchanges an authorization code plus its PKCE verifier for tokens.
    async fn exchange_code_pkce(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<TokenResponse, AuthError>;

    /// Obtains a new access token for a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

pub struct SpotifyTokenClient {
    client: Client,
    token_url: String,
    client_id: String,
    redirect_uri: String,
}

impl SpotifyTokenClient {
    pub fn new(config: &Config) -> Self {
        Self::with_client(super::http_client(), config)
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    async fn request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let res = self.client.post(&self.token_url).form(form).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!(
                "{} {}",
                status.as_u16(),
                body.trim()
            )));
        }

        Ok(res.json::<TokenResponse>().await?)
    }
}

#[async_trait]
impl TokenEndpoint for SpotifyTokenClient {
    async fn exchange_code_pkce(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.request(&[
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        self.request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }
}
