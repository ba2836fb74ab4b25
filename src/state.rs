use std::sync::Arc;

use crate::{
    auth::{JwtKeys, UserRepo},
    config::AppConfig,
    db,
    memory::MemoryDb,
    returns::ReturnRepo,
    storage::{LocalStorage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub returns: Arc<dyn ReturnRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub jwt: JwtKeys,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
            return Self::in_memory(config).await;
        };

        let pool = Arc::new(db::connect(&url).await?);
        let storage = Self::local_storage(&config).await?;
        Ok(Self::from_parts(pool.clone(), pool, storage, config))
    }

    pub async fn in_memory(config: AppConfig) -> anyhow::Result<Self> {
        let mem = Arc::new(MemoryDb::new());
        let storage = Self::local_storage(&config).await?;
        Ok(Self::from_parts(mem.clone(), mem, storage, config))
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        returns: Arc<dyn ReturnRepo>,
        storage: Arc<dyn StorageClient>,
        config: AppConfig,
    ) -> Self {
        Self {
            users,
            returns,
            storage,
            jwt: JwtKeys::from_config(&config.jwt),
            config: Arc::new(config),
        }
    }

    async fn local_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn StorageClient>> {
        let storage =
            LocalStorage::new(&config.uploads.dir, &config.uploads.public_base_url).await?;
        Ok(Arc::new(storage))
    }
}
