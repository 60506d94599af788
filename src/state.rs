use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{google::GoogleProvider, provider::IdentityProvider};
use crate::config::AppConfig;
use crate::db::{MemoryStore, PgStore, Store};
use crate::session::{MemorySessionStore, PgSessionStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Arc<dyn SessionStore>,
    pub provider: Arc<dyn IdentityProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let provider =
            Arc::new(GoogleProvider::new(config.oauth.clone())?) as Arc<dyn IdentityProvider>;

        let (store, sessions) = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }

                (
                    Arc::new(PgStore::new(db.clone())) as Arc<dyn Store>,
                    Arc::new(PgSessionStore::new(db)) as Arc<dyn SessionStore>,
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                (
                    Arc::new(MemoryStore::new()) as Arc<dyn Store>,
                    Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
                )
            }
        };

        Ok(Self::from_parts(store, sessions, provider, config))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            store,
            sessions,
            provider,
            config,
        }
    }
}
