//! Data access layer.
//!
//! `Store` is the contract the rest of the service talks to. Every mutation is
//! atomic. No operation checks ownership; that is the API layer's job.

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::{NewUser, User, WatchlistEntry};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (email, username, google_oauth_id) rejected the write.
    #[error("unique constraint violated")]
    Conflict,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Lookup by provider subject, for accounts whose email has since changed.
    async fn find_user_by_oauth_id(&self, subject: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn create_watchlist_entry(
        &self,
        user_id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<WatchlistEntry, StoreError>;

    async fn list_watchlist_entries(&self, user_id: i64)
        -> Result<Vec<WatchlistEntry>, StoreError>;

    async fn find_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError>;

    async fn update_watchlist_entry(
        &self,
        id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<Option<WatchlistEntry>, StoreError>;

    async fn delete_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError>;
}
