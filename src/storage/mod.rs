//! Durable key-value storage for the outbox.
//!
//! The queue never touches a storage medium directly. It goes through the
//! `KeyValueStore` trait so the same queue logic runs against:
//!
//! - `MemoryKeyValueStore`: in-process `DashMap`, used by tests
//! - `FileKeyValueStore`: one JSON file per key, atomic replace on write
//! - `RedisKeyValueStore`: plain `GET`/`SET`/`DEL` on a prefixed key
//!
//! Use `create_store()` to build the backend named in configuration.

mod factory;
pub mod file;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use thiserror::Error;

pub use factory::create_store;
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use self::redis::RedisKeyValueStore;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis operation failed
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend refused the operation (quota exceeded, injected failure, ...)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// String-keyed, string-valued durable storage.
///
/// # Atomicity
///
/// `set` is all-or-nothing: when it returns an error the previously stored
/// value must still be readable unchanged.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short identifier used in logs and the health endpoint.
    fn backend_name(&self) -> &'static str;

    /// Read the value stored under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
