use crate::state::AppState;
use axum::Router;

pub mod extractors;
pub mod google;
pub mod handlers;
pub mod pages;
pub mod provider;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::page_routes())
        .merge(handlers::auth_routes())
}
