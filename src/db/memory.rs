use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{NewUser, Store, StoreError, User, WatchlistEntry};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    watchlists: BTreeMap<i64, WatchlistEntry>,
    next_user_id: i64,
    next_entry_id: i64,
}

/// In-process `Store` with the same uniqueness rules as the SQL schema.
/// Used by tests and when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    pub fn watchlist_count(&self) -> usize {
        self.lock().watchlists.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        // Every write is a single map operation, so a poisoned lock still holds consistent tables.
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_oauth_id(&self, subject: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.google_oauth_id.as_deref() == Some(subject))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut t = self.lock();
        let taken = t.users.values().any(|u| {
            u.email == user.email
                || u.username == user.username
                || (user.google_oauth_id.is_some() && u.google_oauth_id == user.google_oauth_id)
        });
        if taken {
            return Err(StoreError::Conflict);
        }
        t.next_user_id += 1;
        let row = User {
            id: t.next_user_id,
            username: user.username,
            email: user.email,
            google_oauth_id: user.google_oauth_id,
            hashed_password: None,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn create_watchlist_entry(
        &self,
        user_id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<WatchlistEntry, StoreError> {
        let mut t = self.lock();
        t.next_entry_id += 1;
        let entry = WatchlistEntry {
            id: t.next_entry_id,
            user_id,
            symbol: symbol.to_string(),
            list_name: list_name.to_string(),
        };
        t.watchlists.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_watchlist_entries(
        &self,
        user_id: i64,
    ) -> Result<Vec<WatchlistEntry>, StoreError> {
        Ok(self
            .lock()
            .watchlists
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError> {
        Ok(self.lock().watchlists.get(&id).cloned())
    }

    async fn update_watchlist_entry(
        &self,
        id: i64,
        symbol: &str,
        list_name: &str,
    ) -> Result<Option<WatchlistEntry>, StoreError> {
        let mut t = self.lock();
        Ok(t.watchlists.get_mut(&id).map(|entry| {
            entry.symbol = symbol.to_string();
            entry.list_name = list_name.to_string();
            entry.clone()
        }))
    }

    async fn delete_watchlist_entry(&self, id: i64) -> Result<Option<WatchlistEntry>, StoreError> {
        Ok(self.lock().watchlists.remove(&id))
    }
}
