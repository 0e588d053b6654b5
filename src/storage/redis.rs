//! Redis-backed key-value store.
//!
//! Values live under `{prefix}:{key}` as plain strings. Redis `SET` replaces
//! a value atomically, so the all-or-nothing contract of `KeyValueStore`
//! holds without extra bookkeeping.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::RwLock;

use super::{KeyValueStore, StorageError};

/// Redis key-value store sharing one multiplexed connection.
pub struct RedisKeyValueStore {
    /// Redis client for creating connections
    client: Client,

    /// Multiplexed connection (shared across tasks)
    connection: RwLock<Option<MultiplexedConnection>>,

    /// Key prefix
    prefix: String,
}

impl RedisKeyValueStore {
    /// Create a store for the given URL. No connection is made until first use.
    pub fn new(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let client = Client::open(url)?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
            prefix: prefix.into(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, StorageError> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // Double-check in case another task connected while we waited
        if let Some(ref c) = *conn_guard {
            return Ok(c.clone());
        }

        match self.client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                *conn_guard = Some(conn.clone());
                tracing::info!("Redis storage connection established");
                Ok(conn)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to Redis");
                Err(e.into())
            }
        }
    }

    /// Drop a broken connection so the next call reconnects.
    async fn on_error(&self, e: RedisError) -> StorageError {
        if e.is_connection_dropped() || e.is_io_error() {
            let mut conn_guard = self.connection.write().await;
            *conn_guard = None;
        }
        StorageError::Redis(e)
    }
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.get_connection().await?;
        match conn.get::<_, Option<String>>(self.full_key(key)).await {
            Ok(value) => Ok(value),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        match conn.set::<_, _, ()>(self.full_key(key), value).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e).await),
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        match conn.del::<_, ()>(self.full_key(key)).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error(e).await),
        }
    }
}
