// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local [`KvStore`] backed by hash maps.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use handover_core::{Adapter, AdapterType, HandoverError, HealthStatus, KvStore, KvWrite};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Maps {
    strings: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl Maps {
    fn remove(&mut self, key: &str) {
        self.strings.remove(key);
        self.sets.remove(key);
    }
}

/// In-memory store used by tests and single-process deployments.
///
/// One lock guards both maps, which makes [`KvStore::write_batch`] atomic
/// with respect to every other operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    maps: RwLock<Maps>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Adapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoverError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, HandoverError> {
        Ok(self.maps.read().await.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), HandoverError> {
        let mut maps = self.maps.write().await;
        maps.sets.remove(key);
        maps.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Memory contents die with the process, so `ttl` is not tracked.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        _ttl: Duration,
    ) -> Result<bool, HandoverError> {
        let mut maps = self.maps.write().await;
        if maps.strings.contains_key(key) || maps.sets.contains_key(key) {
            return Ok(false);
        }
        maps.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), HandoverError> {
        self.maps.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, HandoverError> {
        let maps = self.maps.read().await;
        Ok(maps
            .strings
            .keys()
            .chain(maps.sets.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<(), HandoverError> {
        if members.is_empty() {
            return Ok(());
        }
        let mut maps = self.maps.write().await;
        if maps.strings.contains_key(key) {
            return Err(HandoverError::Storage {
                source: format!("key `{key}` holds a string, not a set").into(),
            });
        }
        maps.sets
            .entry(key.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<(), HandoverError> {
        let mut maps = self.maps.write().await;
        let emptied = match maps.sets.get_mut(key) {
            Some(set) => {
                for member in members {
                    set.remove(member);
                }
                set.is_empty()
            }
            None => false,
        };
        if emptied {
            maps.sets.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>, HandoverError> {
        Ok(self
            .maps
            .read()
            .await
            .sets
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), HandoverError> {
        let mut maps = self.maps.write().await;
        for write in writes {
            match write {
                KvWrite::Set { key, value } => {
                    maps.sets.remove(&key);
                    maps.strings.insert(key, value);
                }
                KvWrite::Delete { key } => maps.remove(&key),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn members(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn strings_get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sets_add_remove_and_vanish_when_empty() {
        let store = MemoryStore::new();
        store.set_add("s", &members(&["U1", "U2"])).await.unwrap();
        store.set_add("s", &members(&["U2", "U3"])).await.unwrap();
        assert_eq!(store.set_members("s").await.unwrap().len(), 3);

        store.set_remove("s", &members(&["U1", "U2", "U3"])).await.unwrap();
        assert!(store.set_members("s").await.unwrap().is_empty());
        assert!(store.list_keys("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_add_on_string_key_is_rejected() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        let err = store.set_add("k", &members(&["x"])).await.unwrap_err();
        assert!(matches!(err, HandoverError::Storage { .. }));
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix_across_types() {
        let store = MemoryStore::new();
        store.set("session:a", "{}").await.unwrap();
        store.set("thread:1", "a").await.unwrap();
        store.set_add("assign:x:y", &members(&["U1"])).await.unwrap();
        store.set_add("session:set", &members(&["z"])).await.unwrap();

        let mut keys = store.list_keys("session:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:a", "session:set"]);
        assert_eq!(store.list_keys("assign:").await.unwrap(), vec!["assign:x:y"]);
    }

    #[tokio::test]
    async fn set_if_absent_claims_once() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        assert!(store.set_if_absent("claim:s1", "a", ttl).await.unwrap());
        assert!(!store.set_if_absent("claim:s1", "b", ttl).await.unwrap());
        assert_eq!(store.get("claim:s1").await.unwrap().as_deref(), Some("a"));

        store.set_add("roles", &members(&["vip"])).await.unwrap();
        assert!(!store.set_if_absent("roles", "x", ttl).await.unwrap());

        store.delete("claim:s1").await.unwrap();
        assert!(store.set_if_absent("claim:s1", "c", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let attempts = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .set_if_absent("claim:s1", &i.to_string(), Duration::from_secs(60))
                    .await
                    .unwrap()
            })
        });
        let mut winners = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn write_batch_applies_in_order() {
        let store = MemoryStore::new();
        store.set("old", "x").await.unwrap();
        store
            .write_batch(vec![
                KvWrite::set("a", "1"),
                KvWrite::delete("old"),
                KvWrite::set("a", "2"),
            ])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.get("old").await.unwrap(), None);
    }

    proptest! {
        #[test]
        fn set_remove_leaves_the_difference(
            added in proptest::collection::btree_set("[a-z]{1,4}", 0..8),
            removed in proptest::collection::btree_set("[a-z]{1,4}", 0..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryStore::new();
                let added_vec: Vec<String> = added.iter().cloned().collect();
                let removed_vec: Vec<String> = removed.iter().cloned().collect();
                store.set_add("roles", &added_vec).await.unwrap();
                store.set_remove("roles", &removed_vec).await.unwrap();

                let expected: BTreeSet<String> = added.difference(&removed).cloned().collect();
                prop_assert_eq!(store.set_members("roles").await.unwrap(), expected.clone());
                let listed = store.list_keys("roles").await.unwrap();
                prop_assert_eq!(listed.is_empty(), expected.is_empty());
                Ok(())
            })?;
        }
    }
}
