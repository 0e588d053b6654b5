//! Storage backend factory

use std::sync::Arc;

use crate::config::StorageConfig;

use super::file::FileKeyValueStore;
use super::memory::MemoryKeyValueStore;
use super::redis::RedisKeyValueStore;
use super::{KeyValueStore, StorageError};

/// Create a storage backend based on configuration.
///
/// - `"memory"`: `MemoryKeyValueStore`
/// - `"redis"`: `RedisKeyValueStore` (fails if the URL is invalid)
/// - `"file"` (default): `FileKeyValueStore` rooted at `settings.dir`
pub fn create_store(settings: &StorageConfig) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    match settings.backend.as_str() {
        "memory" => {
            tracing::info!(backend = "memory", "Creating memory storage backend");
            Ok(Arc::new(MemoryKeyValueStore::new()))
        }
        "redis" => {
            tracing::info!(
                backend = "redis",
                prefix = %settings.redis_prefix,
                "Creating Redis storage backend"
            );
            Ok(Arc::new(RedisKeyValueStore::new(
                &settings.redis_url,
                settings.redis_prefix.clone(),
            )?))
        }
        other => {
            if other != "file" {
                tracing::warn!(
                    backend = %other,
                    "Unknown storage backend requested, falling back to file"
                );
            }
            tracing::info!(backend = "file", dir = %settings.dir, "Creating file storage backend");
            Ok(Arc::new(FileKeyValueStore::new(settings.dir.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str) -> StorageConfig {
        StorageConfig {
            backend: backend.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_selects_backend_by_name() {
        assert_eq!(create_store(&config("memory")).unwrap().backend_name(), "memory");
        assert_eq!(create_store(&config("file")).unwrap().backend_name(), "file");
        assert_eq!(create_store(&config("redis")).unwrap().backend_name(), "redis");
    }

    #[test]
    fn test_unknown_backend_falls_back_to_file() {
        assert_eq!(create_store(&config("sqlite")).unwrap().backend_name(), "file");
    }
}
