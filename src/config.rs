use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// OAuth client registration and provider endpoints. Defaults point at Google.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    pub issuer: String,
    pub scopes: Vec<String>,
    pub timeout_secs: u64,
}

impl OAuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs with the in-memory store.
    pub database_url: Option<String>,
    pub oauth: OAuthConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let redirect_uri = std::env::var("REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:8000/auth".into());
        let secure_cookie = redirect_uri.starts_with("https://");

        let oauth = OAuthConfig {
            client_id: std::env::var("CLIENT_ID").context("CLIENT_ID is not set")?,
            client_secret: std::env::var("CLIENT_SECRET").context("CLIENT_SECRET is not set")?,
            redirect_uri,
            authorization_endpoint: std::env::var("OAUTH_AUTHORIZATION_ENDPOINT")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".into()),
            token_endpoint: std::env::var("OAUTH_TOKEN_ENDPOINT")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".into()),
            userinfo_endpoint: std::env::var("OAUTH_USERINFO_ENDPOINT")
                .unwrap_or_else(|_| "https://openidconnect.googleapis.com/v1/userinfo".into()),
            jwks_uri: std::env::var("OAUTH_JWKS_URI")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/certs".into()),
            issuer: std::env::var("OAUTH_ISSUER")
                .unwrap_or_else(|_| "https://accounts.google.com".into()),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
            timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        };

        let session = SessionConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
            secure_cookie,
        };

        Ok(Self {
            database_url,
            oauth,
            session,
        })
    }

    /// Config used by unit and end-to-end tests. Endpoints are never contacted.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            oauth: OAuthConfig {
                client_id: "test-client-id".into(),
                client_secret: "test-client-secret".into(),
                redirect_uri: "http://localhost:8000/auth".into(),
                authorization_endpoint: "https://provider.test/authorize".into(),
                token_endpoint: "https://provider.test/token".into(),
                userinfo_endpoint: "https://provider.test/userinfo".into(),
                jwks_uri: "https://provider.test/certs".into(),
                issuer: "https://provider.test".into(),
                scopes: vec!["openid".into(), "email".into(), "profile".into()],
                timeout_secs: 2,
            },
            session: SessionConfig {
                secret: "test-secret-key-32-bytes-long!!".into(),
                ttl_minutes: 60,
                secure_cookie: false,
            },
        }
    }
}
