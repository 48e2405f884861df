//! Access-token acquisition for authenticated backend calls.
//!
//! The identity provider is an injected capability: the adapter asks for a
//! fresh token on every outgoing request and never caches one. Expiry and
//! refresh are the provider's problem, not ours.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("no credentials configured")]
    NotConfigured,
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("token endpoint returned http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Capability to produce a bearer credential on demand.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Returns a fresh access token. Called once per authenticated request.
    async fn access_token(&self) -> Result<SecretString, AuthError>;
}

/// Fixed token, for tests and service-to-service setups where the token is
/// provisioned out of band.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        Ok(self.token.clone())
    }
}

/// Always fails acquisition. Requests then go out without an Authorization
/// header and the backend's auth error is surfaced to the caller.
pub struct UnauthenticatedProvider;

#[async_trait]
impl AccessTokenProvider for UnauthenticatedProvider {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        Err(AuthError::NotConfigured)
    }
}

#[derive(Debug, Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth2 client-credentials grant against an OIDC token endpoint.
pub struct ClientCredentialsProvider {
    http: Client,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
    audience: Option<String>,
}

impl ClientCredentialsProvider {
    pub fn new(
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: SecretString,
        audience: Option<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            token_url,
            client_id: client_id.into(),
            client_secret,
            audience,
        }
    }
}

#[async_trait]
impl AccessTokenProvider for ClientCredentialsProvider {
    async fn access_token(&self) -> Result<SecretString, AuthError> {
        debug!(token_url = %self.token_url, "requesting access token");

        let body = ClientCredentialsRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            audience: self.audience.as_deref(),
        };

        let res = self
            .http
            .post(self.token_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(AuthError::Http { status, body });
        }

        let token: TokenResponse = res
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        Ok(SecretString::from(token.access_token))
    }
}
