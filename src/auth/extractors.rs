use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::services::resolve_from_token;
use crate::{db::User, error::AppError, state::AppState};

/// The user behind the request's bearer token.
pub struct CurrentUser(pub User);

pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    let (scheme, token) = auth.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            warn!("missing or malformed Authorization header");
            return Err(AppError::Unauthenticated);
        };

        let user = resolve_from_token(state.store.as_ref(), state.provider.as_ref(), token).await?;
        Ok(CurrentUser(user))
    }
}
