use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;

use super::provider::{
    build_authorization_url, IdentityClaims, IdentityProvider, ProviderError, ProviderLogin,
};
use crate::config::OAuthConfig;

const JWKS_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Google (or any OpenID Connect provider with the same endpoints).
///
/// The client registration is fixed at construction. Every outbound call shares
/// one `reqwest::Client` with the configured timeout.
pub struct GoogleProvider {
    config: OAuthConfig,
    http: reqwest::Client,
    jwks: RwLock<Option<CachedJwks>>,
}

impl GoogleProvider {
    pub fn new(config: OAuthConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            config,
            http,
            jwks: RwLock::new(None),
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<IdentityClaims, ProviderError> {
        let res = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;
        if res.status() == StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Rejected {
                error: "invalid_token".into(),
                description: None,
            });
        }
        Ok(res.error_for_status()?.json::<IdentityClaims>().await?)
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, ProviderError> {
        let keys = self
            .http
            .get(&self.config.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;
        debug!(count = keys.keys.len(), "provider signing keys fetched");
        Ok(keys)
    }

    /// Finds the signing key for `kid`, refreshing the cache when it is stale
    /// or does not know the key (the provider rotates keys).
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, ProviderError> {
        {
            let cache = self.jwks.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < JWKS_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(DecodingKey::from_jwk(jwk)?);
                    }
                }
            }
        }

        let keys = self.fetch_jwks().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()?
            .ok_or(ProviderError::MalformedToken("unknown signing key"))?;
        *self.jwks.write().await = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });
        Ok(key)
    }

    async fn verify_id_token(&self, token: &str) -> Result<IdentityClaims, ProviderError> {
        let header = decode_header(token)?;
        if header.alg != Algorithm::RS256 {
            return Err(ProviderError::MalformedToken("unexpected signing algorithm"));
        }
        let kid = header
            .kid
            .ok_or(ProviderError::MalformedToken("missing key id"))?;
        let key = self.decoding_key(&kid).await?;

        let issuer = self.config.issuer.as_str();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(std::slice::from_ref(&self.config.client_id));
        // Google uses both forms of its issuer.
        validation.set_issuer(&[issuer, issuer.trim_start_matches("https://")]);

        let data = decode::<IdentityClaims>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

fn looks_like_jwt(token: &str) -> bool {
    token.split('.').count() == 3
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> Result<Url, ProviderError> {
        build_authorization_url(&self.config, state)
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<ProviderLogin, ProviderError> {
        let res = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.json::<OAuthErrorBody>().await.unwrap_or(OAuthErrorBody {
                error: format!("http_{}", status.as_u16()),
                error_description: None,
            });
            warn!(%status, error = %body.error, "token exchange rejected");
            return Err(ProviderError::Rejected {
                error: body.error,
                description: body.error_description,
            });
        }

        let tokens = res.json::<TokenResponse>().await?;
        let claims = match tokens.id_token.as_deref() {
            Some(id_token) => self.verify_id_token(id_token).await?,
            None => self.fetch_userinfo(&tokens.access_token).await?,
        };
        debug!(has_email = claims.email.is_some(), "token exchange succeeded");

        Ok(ProviderLogin {
            access_token: tokens.access_token,
            claims,
        })
    }

    /// ID tokens (JWTs) are checked locally against the provider's keys; anything
    /// else is treated as an access token and checked at the userinfo endpoint.
    async fn verify_token(&self, token: &str) -> Result<IdentityClaims, ProviderError> {
        if looks_like_jwt(token) {
            self.verify_id_token(token).await
        } else {
            self.fetch_userinfo(token).await
        }
    }
}
