//! Server-side sessions.
//!
//! The browser holds a signed session id cookie. The contents live in a
//! `SessionStore`, which handlers receive through `AppState` rather than as
//! ambient global state.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::provider::IdentityClaims, config::SessionConfig, error::AppError, state::AppState};

mod cookie;
mod memory;
mod postgres;

pub use cookie::{sign_session_id, verify_session_cookie, SESSION_COOKIE};
pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

/// Where a browser is in the login flow, as far as its session shows.
/// `CALLBACK_PENDING` only exists while `/auth` is running and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Anonymous,
    StateIssued,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Anti-forgery token issued by `/login`, consumed by `/auth`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Full claim set from the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<IdentityClaims>,
    /// Provider access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SessionData {
    pub fn flow_state(&self) -> FlowState {
        match (&self.user, &self.state) {
            (Some(_), _) => FlowState::Authenticated,
            (None, Some(_)) => FlowState::StateIssued,
            (None, None) => FlowState::Anonymous,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns `None` for unknown or expired sessions.
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<SessionData>>;

    async fn set(&self, id: Uuid, data: &SessionData, expires_at: OffsetDateTime)
        -> anyhow::Result<()>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

/// The caller's session, loaded from the cookie or freshly allocated.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub data: SessionData,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let secret = &state.config.session.secret;

        if let Some(id) = jar
            .get(SESSION_COOKIE)
            .and_then(|c| verify_session_cookie(c.value(), secret))
        {
            if let Some(data) = state.sessions.get(id).await? {
                return Ok(Session { id, data });
            }
            debug!(session_id = %id, "session cookie refers to unknown or expired session");
        }

        Ok(Session {
            id: Uuid::new_v4(),
            data: SessionData::default(),
        })
    }
}

impl Session {
    /// Moves the session to a fresh id and deletes the record under the old one.
    pub async fn rotate(&mut self, store: &dyn SessionStore) -> Result<(), AppError> {
        let old = std::mem::replace(&mut self.id, Uuid::new_v4());
        store.delete(old).await?;
        debug!(old = %old, new = %self.id, "session id rotated");
        Ok(())
    }

    /// Persists the session and returns the cookie jar to attach to the response.
    pub async fn save(
        &self,
        store: &dyn SessionStore,
        config: &SessionConfig,
    ) -> Result<CookieJar, AppError> {
        let ttl = Duration::minutes(config.ttl_minutes);
        store
            .set(self.id, &self.data, OffsetDateTime::now_utc() + ttl)
            .await?;

        let value = sign_session_id(self.id, &config.secret)?;
        let cookie = Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(config.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(ttl);
        Ok(CookieJar::new().add(cookie))
    }
}
