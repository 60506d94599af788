//! OpenAPI document for the watchlist API, served at `/openapi.json`.
//!
//! Clients authorize through the provider's authorization-code flow; the
//! security scheme points at the configured endpoints.

use axum::{extract::State, routing::get, Json, Router};
use utoipa::{
    openapi::security::{AuthorizationCode, Flow, OAuth2, Scopes, SecurityScheme},
    OpenApi,
};

use crate::{config::OAuthConfig, db::WatchlistEntry, state::AppState, watchlists::handlers};

pub const SECURITY_SCHEME: &str = "oauth2";

#[derive(OpenApi)]
#[openapi(
    info(title = "stockwatch", description = "Per-user stock watchlists"),
    paths(
        handlers::list_entries,
        handlers::create_entry,
        handlers::get_entry,
        handlers::update_entry,
        handlers::delete_entry
    ),
    components(schemas(WatchlistEntry)),
    tags((name = "watchlists", description = "Watchlist entries owned by the caller"))
)]
struct ApiDoc;

fn scope_description(scope: &str) -> String {
    match scope {
        "openid" => "OpenID Connect sign-in".to_string(),
        "email" => "Email address".to_string(),
        "profile" => "Basic profile".to_string(),
        other => other.to_string(),
    }
}

pub fn document(oauth: &OAuthConfig) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let scopes = Scopes::from_iter(
        oauth
            .scopes
            .iter()
            .map(|s| (s.clone(), scope_description(s))),
    );
    let flow = AuthorizationCode::new(
        oauth.authorization_endpoint.clone(),
        oauth.token_endpoint.clone(),
        scopes,
    );
    if let Some(components) = doc.components.as_mut() {
        components.add_security_scheme(
            SECURITY_SCHEME,
            SecurityScheme::OAuth2(OAuth2::new([Flow::AuthorizationCode(flow)])),
        );
    }
    doc
}

async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(document(&state.config.oauth))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}
