use crate::config::{AppConfig, StoreBackend};
use crate::store::{DocumentStore, MemoryStore, PgStore};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL missing")?;
                let pg = PgStore::connect(url).await?;
                pg.migrate().await?;
                info!("connected to postgres");
                Arc::new(pg) as Arc<dyn DocumentStore>
            }
            StoreBackend::Memory => {
                warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>
            }
        };

        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn DocumentStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            cors_origin: None,
            host: "127.0.0.1".into(),
            port: 0,
        });

        Self::from_parts(Arc::new(MemoryStore::new()), config)
    }
}
