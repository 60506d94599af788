use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    auth::{
        pages,
        services::{generate_state_token, states_match, upsert_oauth_user},
    },
    error::AppError,
    session::Session,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/auth", get(auth_callback))
        .route("/logout", get(logout))
}

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/welcome", get(welcome))
}

/// 302 Found.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[instrument(skip_all)]
pub async fn index(session: Session) -> Response {
    if session.data.user.is_some() {
        return found("/welcome");
    }
    pages::landing().into_response()
}

#[instrument(skip_all)]
pub async fn welcome(session: Session) -> Response {
    match &session.data.user {
        Some(user) => pages::welcome(user).into_response(),
        None => found("/login"),
    }
}

/// ANONYMOUS → STATE_ISSUED
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<(CookieJar, Response), AppError> {
    let token = generate_state_token();
    let url = state.provider.authorization_url(&token).map_err(|e| {
        error!(error = %e, "cannot build authorization url");
        AppError::Internal(e.into())
    })?;

    session.data.state = Some(token);
    let jar = session
        .save(state.sessions.as_ref(), &state.config.session)
        .await?;

    debug!("state issued, redirecting to provider");
    Ok((jar, found(url.as_str())))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// STATE_ISSUED → CALLBACK_PENDING → AUTHENTICATED, or REJECTED.
#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn auth_callback(
    State(state): State<AppState>,
    mut session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    if !states_match(session.data.state.as_deref(), query.state.as_deref()) {
        warn!(
            stored = session.data.state.is_some(),
            received = query.state.is_some(),
            "mismatching state"
        );
        return Err(AppError::StateMismatch);
    }

    // Single use: consumed before talking to the provider.
    session.data.state = None;
    session
        .save(state.sessions.as_ref(), &state.config.session)
        .await?;

    if let Some(err) = query.error {
        warn!(error = %err, "provider denied authorization");
        return Err(AppError::Provider(err));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::Provider("missing authorization code".into()))?;

    let login = match state.provider.exchange_code(&code).await {
        Ok(login) => login,
        Err(e) => {
            error!(error = %e, "code exchange failed");
            return Err(AppError::Provider(e.to_string()));
        }
    };

    let user = upsert_oauth_user(state.store.as_ref(), &login.claims).await?;

    // A pre-login id must not carry over into the authenticated session.
    session.rotate(state.sessions.as_ref()).await?;
    session.data.user = Some(login.claims);
    session.data.token = Some(login.access_token);
    let jar = session
        .save(state.sessions.as_ref(), &state.config.session)
        .await?;

    info!(user_id = user.id, session_id = %session.id, "user authenticated");
    Ok((jar, found("/welcome")))
}

#[instrument(skip_all, fields(session_id = %session.id))]
pub async fn logout(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let had_user = session.data.user.take().is_some();
    let had_token = session.data.token.take().is_some();
    if !had_user && !had_token {
        return Ok(found("/"));
    }

    let jar = session
        .save(state.sessions.as_ref(), &state.config.session)
        .await?;
    debug!("session cleared");
    Ok((jar, found("/")).into_response())
}
