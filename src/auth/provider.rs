//! Identity provider seam.
//!
//! The flow controller and the token resolver only see `IdentityProvider`.
//! The production implementation is `GoogleProvider`; tests plug in fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::OAuthConfig;

/// OpenID Connect claims about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Everything else the provider sent.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdentityClaims {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }
}

/// Result of a successful authorization-code exchange.
#[derive(Debug, Clone)]
pub struct ProviderLogin {
    pub access_token: String,
    pub claims: IdentityClaims,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with an OAuth error (`invalid_grant`, ...).
    #[error("{error}")]
    Rejected {
        error: String,
        description: Option<String>,
    },

    /// Network failure, timeout or unreadable response.
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("malformed token: {0}")]
    MalformedToken(&'static str),

    #[error("invalid provider endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's consent screen for this `state`.
    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError>;

    /// Trades an authorization code for an access token and identity claims.
    async fn exchange_code(&self, code: &str) -> Result<ProviderLogin, ProviderError>;

    /// Validates a presented bearer token and returns its claims.
    async fn verify_token(&self, token: &str) -> Result<IdentityClaims, ProviderError>;
}

/// Builds the authorization-code request URL, forcing the consent prompt.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> Result<Url, ProviderError> {
    let mut url = Url::parse(&config.authorization_endpoint)?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state)
        .append_pair("prompt", "consent");
    Ok(url)
}
