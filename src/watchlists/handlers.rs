use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, info, instrument};

use super::{
    dto::{WatchlistInput, WatchlistParams},
    services::owned_entry,
};
use crate::{
    auth::extractors::CurrentUser,
    db::WatchlistEntry,
    error::AppError,
    state::AppState,
};

pub fn watchlist_routes() -> Router<AppState> {
    Router::new()
        .route("/watchlists", get(list_entries).post(create_entry))
        .route("/watchlists/", get(list_entries).post(create_entry))
        .route(
            "/watchlists/:id",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
}

#[utoipa::path(
    post,
    path = "/watchlists/",
    tag = "watchlists",
    params(WatchlistParams),
    responses(
        (status = 201, description = "Entry created", body = WatchlistEntry),
        (status = 400, description = "Missing or empty field"),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("oauth2" = ["openid", "email", "profile"]))
)]
#[instrument(skip(state, user, input), fields(user_id = user.id))]
pub async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WatchlistInput(input): WatchlistInput,
) -> Result<(StatusCode, Json<WatchlistEntry>), AppError> {
    let WatchlistParams { symbol, list_name } = input;
    let entry = state
        .store
        .create_watchlist_entry(user.id, &symbol, &list_name)
        .await?;
    info!(entry_id = entry.id, symbol = %entry.symbol, "watchlist entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/watchlists/",
    tag = "watchlists",
    responses(
        (status = 200, description = "The caller's entries", body = Vec<WatchlistEntry>),
        (status = 401, description = "Missing or invalid bearer token")
    ),
    security(("oauth2" = ["openid", "email", "profile"]))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<WatchlistEntry>>, AppError> {
    let entries = state.store.list_watchlist_entries(user.id).await?;
    debug!(count = entries.len(), "watchlist listed");
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/watchlists/{id}",
    tag = "watchlists",
    params(("id" = i64, Path, description = "Watchlist entry id")),
    responses(
        (status = 200, description = "The entry", body = WatchlistEntry),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such entry owned by the caller")
    ),
    security(("oauth2" = ["openid", "email", "profile"]))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn get_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<WatchlistEntry>, AppError> {
    let entry = owned_entry(state.store.as_ref(), id, &user).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    put,
    path = "/watchlists/{id}",
    tag = "watchlists",
    params(("id" = i64, Path, description = "Watchlist entry id"), WatchlistParams),
    responses(
        (status = 200, description = "The updated entry", body = WatchlistEntry),
        (status = 400, description = "Missing or empty field"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such entry owned by the caller")
    ),
    security(("oauth2" = ["openid", "email", "profile"]))
)]
#[instrument(skip(state, user, input), fields(user_id = user.id))]
pub async fn update_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    WatchlistInput(input): WatchlistInput,
) -> Result<Json<WatchlistEntry>, AppError> {
    owned_entry(state.store.as_ref(), id, &user).await?;

    // Gone between the ownership check and the write.
    let updated = state
        .store
        .update_watchlist_entry(id, &input.symbol, &input.list_name)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(entry_id = id, "watchlist entry updated");
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/watchlists/{id}",
    tag = "watchlists",
    params(("id" = i64, Path, description = "Watchlist entry id")),
    responses(
        (status = 200, description = "The deleted entry", body = WatchlistEntry),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No such entry owned by the caller")
    ),
    security(("oauth2" = ["openid", "email", "profile"]))
)]
#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<WatchlistEntry>, AppError> {
    owned_entry(state.store.as_ref(), id, &user).await?;

    let deleted = state
        .store
        .delete_watchlist_entry(id)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(entry_id = id, "watchlist entry deleted");
    Ok(Json(deleted))
}
