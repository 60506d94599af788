use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionData, SessionStore};

/// Expired entries are dropped on read and swept on every write.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, (SessionData, OffsetDateTime)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<SessionData>> {
        let now = OffsetDateTime::now_utc();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                Some((data, expires_at)) if *expires_at > now => return Ok(Some(data.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        self.sessions.write().await.remove(&id);
        Ok(None)
    }

    async fn set(
        &self,
        id: Uuid,
        data: &SessionData,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, exp)| *exp > now);
        sessions.insert(id, (data.clone(), expires_at));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.sessions.write().await.remove(&id);
        Ok(())
    }
}
