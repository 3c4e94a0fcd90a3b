// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store adapter trait for the shared state backend.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HandoverError;
use crate::traits::adapter::Adapter;

/// A single write applied as part of [`KvStore::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvWrite {
    Set { key: String, value: String },
    Delete { key: String },
}

impl KvWrite {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Generic operations against the shared key-value store.
///
/// Every single-key operation is atomic. [`write_batch`](KvStore::write_batch)
/// applies several writes as one atomic unit so multi-key records never
/// appear half-written to concurrent readers.
#[async_trait]
pub trait KvStore: Adapter {
    /// Reads a string value.
    async fn get(&self, key: &str) -> Result<Option<String>, HandoverError>;

    /// Writes a string value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), HandoverError>;

    /// Writes `value` only if `key` holds nothing. Returns whether this call
    /// wrote it. Backends that support expiry drop the key after `ttl`.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, HandoverError>;

    /// Removes a key of any type. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), HandoverError>;

    /// Lists every key starting with `prefix`, in no particular order.
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, HandoverError>;

    /// Adds members to the set stored at `key`, creating it if needed.
    async fn set_add(&self, key: &str, members: &[String]) -> Result<(), HandoverError>;

    /// Removes members from the set at `key`; an emptied set disappears.
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<(), HandoverError>;

    /// Returns the members of the set at `key` (empty if absent).
    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>, HandoverError>;

    /// Applies all writes atomically, in order.
    async fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), HandoverError>;
}
