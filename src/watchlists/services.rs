use crate::{
    db::{Store, User, WatchlistEntry},
    error::AppError,
};

/// Ownership guard shared by get, update and delete. Someone else's entry looks
/// exactly like a missing one, so ids of other users' entries are never confirmed.
pub fn assert_owns_or_not_found(
    entry: Option<WatchlistEntry>,
    user: &User,
) -> Result<WatchlistEntry, AppError> {
    match entry {
        Some(entry) if entry.user_id == user.id => Ok(entry),
        _ => Err(AppError::NotFound),
    }
}

/// Loads entry `id` and applies the ownership guard.
pub async fn owned_entry(store: &dyn Store, id: i64, user: &User) -> Result<WatchlistEntry, AppError> {
    let entry = store.find_watchlist_entry(id).await?;
    assert_owns_or_not_found(entry, user)
}
