use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{NewUser, Store, StoreError, User, WatchlistEntry};

/// `Store` backed by PostgreSQL. Each statement runs in its own implicit
/// transaction, so every mutation commits on success or not at all.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, google_oauth_id, hashed_password
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_oauth_id(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, google_oauth_id, hashed_password
            FROM users
            WHERE google_oauth_id = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, google_oauth_id)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, google_oauth_id, hashed_password
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.google_oauth_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique)?;
        debug!(user_id = user.id, "user inserted");
        Ok(user)
    }

    async fn create_watchlist_entry(
        &self,
        user_id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<WatchlistEntry, StoreError> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            INSERT INTO watchlists (user_id, symbol, list_name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, symbol, list_name
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .bind(list_name)
        .fetch_one(&self.db)
        .await?;
        Ok(entry)
    }

    async fn list_watchlist_entries(
        &self,
        user_id: i64,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        let rows = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            SELECT id, user_id, symbol, list_name
            FROM watchlists
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            SELECT id, user_id, symbol, list_name
            FROM watchlists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }

    async fn update_watchlist_entry(
        &self,
        id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<Option<WatchlistEntry>, StoreError> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            UPDATE watchlists
            SET symbol = $2, list_name = $3
            WHERE id = $1
            RETURNING id, user_id, symbol, list_name
            "#,
        )
        .bind(id)
        .bind(symbol)
        .bind(list_name)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }

    async fn delete_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError> {
        let entry = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            DELETE FROM watchlists
            WHERE id = $1
            RETURNING id, user_id, symbol, list_name
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(entry)
    }
}
