// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared key-value state for the Handover relay.
//!
//! Every piece of durable state lives behind the [`KvStore`] trait so that
//! several relay processes can share one store. Two backends are provided:
//! [`MemoryStore`] for tests and single-process setups, and [`RedisStore`]
//! for deployments that must survive a restart. The key layout shared by
//! the registries lives in [`keys`].

pub mod keys;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;

use handover_config::model::{StorageBackend, StorageConfig};
use handover_core::{HandoverError, KvStore};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Opens the backend selected by `config`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn KvStore>, HandoverError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store; sessions will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Redis => Ok(Arc::new(RedisStore::connect(config).await?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_opens_memory_store() {
        let store = open_store(&StorageConfig::default()).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn redis_backend_without_url_is_a_config_error() {
        let config = StorageConfig {
            backend: StorageBackend::Redis,
            ..StorageConfig::default()
        };
        let err = open_store(&config).await.err().unwrap();
        assert!(matches!(err, HandoverError::Config(_)));
    }
}
