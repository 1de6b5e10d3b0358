pub mod app_config;
pub mod memory;
pub mod local;
pub mod redis_repo;
pub mod sync;
pub mod backup;

use std::sync::Arc;

use app_config::{StorageBackend, StorageConfig};
use rally_core::repository::Store;
use rally_core::{CoreError, CoreResult};

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use redis_repo::RedisStore;

/// Open the configured primary store.
pub async fn open(config: &StorageConfig) -> CoreResult<Arc<dyn Store>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Local => {
            let dir = config
                .data_dir
                .as_deref()
                .ok_or_else(|| CoreError::ValidationError("storage.data_dir is required for the local backend".into()))?;
            Ok(Arc::new(LocalStore::open(dir).await?))
        }
        StorageBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| CoreError::ValidationError("storage.redis_url is required for the redis backend".into()))?;
            Ok(Arc::new(RedisStore::connect(url, &config.channel).await?))
        }
    }
}
