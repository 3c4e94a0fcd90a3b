// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing of `(category, subcategory)` tag pairs to responder ids.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use handover_core::{HandoverError, KvStore};
use handover_storage::keys;
use tracing::info;

/// Many-to-many mapping from tag pairs to chat-platform user ids.
///
/// Lookups match the exact pair only. There is no fallback from
/// `(category, subcategory)` to `category` alone.
#[derive(Clone)]
pub struct AssignmentDirectory {
    store: Arc<dyn KvStore>,
}

fn pair_key(category: &str, subcategory: &str) -> Result<String, HandoverError> {
    let (category, subcategory) = (category.trim(), subcategory.trim());
    if category.is_empty() || subcategory.is_empty() {
        return Err(HandoverError::InvalidCommand(
            "category and subcategory are both required".into(),
        ));
    }
    if category.contains(':') {
        return Err(HandoverError::InvalidCommand(format!(
            "category `{category}` must not contain `:`"
        )));
    }
    Ok(keys::assignment_key(category, subcategory))
}

impl AssignmentDirectory {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Adds `ids` to the responders of the pair.
    pub async fn add_responders(
        &self,
        category: &str,
        subcategory: &str,
        ids: &[String],
    ) -> Result<(), HandoverError> {
        let key = pair_key(category, subcategory)?;
        self.store.set_add(&key, ids).await?;
        info!(%key, added = ids.len(), "responders assigned");
        Ok(())
    }

    /// Removes `ids` from the pair, or clears the pair when `ids` is empty.
    pub async fn remove_responders(
        &self,
        category: &str,
        subcategory: &str,
        ids: &[String],
    ) -> Result<(), HandoverError> {
        let key = pair_key(category, subcategory)?;
        if ids.is_empty() {
            self.store.delete(&key).await?;
            info!(%key, "assignment cleared");
        } else {
            self.store.set_remove(&key, ids).await?;
            info!(%key, removed = ids.len(), "responders unassigned");
        }
        Ok(())
    }

    /// Responders for the exact pair; empty when none are assigned.
    pub async fn list_responders(
        &self,
        category: &str,
        subcategory: &str,
    ) -> Result<BTreeSet<String>, HandoverError> {
        let key = pair_key(category, subcategory)?;
        self.store.set_members(&key).await
    }

    /// Every pair with at least one responder.
    pub async fn list_all(
        &self,
    ) -> Result<BTreeMap<(String, String), BTreeSet<String>>, HandoverError> {
        let mut all = BTreeMap::new();
        for key in self.store.list_keys(keys::ASSIGNMENT_PREFIX).await? {
            let Some((category, subcategory)) = keys::parse_assignment_key(&key) else {
                continue;
            };
            let members = self.store.set_members(&key).await?;
            if !members.is_empty() {
                all.insert((category.to_string(), subcategory.to_string()), members);
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_storage::MemoryStore;
    use proptest::prelude::*;

    fn directory() -> AssignmentDirectory {
        AssignmentDirectory::new(Arc::new(MemoryStore::new()))
    }

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn add_and_remove_responders() {
        let dir = directory();
        dir.add_responders("billing", "refunds", &ids(&["U1", "U2"]))
            .await
            .unwrap();
        dir.add_responders("billing", "refunds", &ids(&["U2", "U3"]))
            .await
            .unwrap();
        assert_eq!(
            dir.list_responders("billing", "refunds").await.unwrap(),
            set(&["U1", "U2", "U3"])
        );

        dir.remove_responders("billing", "refunds", &ids(&["U2"]))
            .await
            .unwrap();
        assert_eq!(
            dir.list_responders("billing", "refunds").await.unwrap(),
            set(&["U1", "U3"])
        );

        dir.remove_responders("billing", "refunds", &[]).await.unwrap();
        assert!(dir.list_responders("billing", "refunds").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_is_exact_pair_only() {
        let dir = directory();
        dir.add_responders("billing", "refunds", &ids(&["U1"]))
            .await
            .unwrap();
        assert!(dir.list_responders("billing", "invoices").await.unwrap().is_empty());
        assert!(dir.list_responders("Billing", "refunds").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_all_reports_non_empty_pairs() {
        let dir = directory();
        dir.add_responders("billing", "refunds", &ids(&["U1"]))
            .await
            .unwrap();
        dir.add_responders("sales", "b2b", &ids(&["U2", "U3"]))
            .await
            .unwrap();
        dir.add_responders("sales", "b2c", &ids(&["U4"])).await.unwrap();
        dir.remove_responders("sales", "b2c", &ids(&["U4"]))
            .await
            .unwrap();

        let all = dir.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[&("sales".to_string(), "b2b".to_string())],
            set(&["U2", "U3"])
        );
    }

    #[tokio::test]
    async fn malformed_pairs_are_rejected() {
        let dir = directory();
        for (cat, sub) in [("", "x"), ("x", " "), ("a:b", "c")] {
            let err = dir.add_responders(cat, sub, &ids(&["U1"])).await.unwrap_err();
            assert!(matches!(err, HandoverError::InvalidCommand(_)), "{cat}/{sub}");
        }
    }

    proptest! {
        #[test]
        fn removing_what_was_added_leaves_the_rest(
            added in proptest::collection::btree_set("U[0-9A-Z]{3}", 1..8),
            removed in proptest::collection::btree_set("U[0-9A-Z]{3}", 0..8),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let dir = directory();
                let added_vec: Vec<String> = added.iter().cloned().collect();
                let removed_vec: Vec<String> = removed.iter().cloned().collect();
                dir.add_responders("c", "s", &added_vec).await.unwrap();
                if !removed_vec.is_empty() {
                    dir.remove_responders("c", "s", &removed_vec).await.unwrap();
                }
                let expected: BTreeSet<String> = added.difference(&removed).cloned().collect();
                prop_assert_eq!(dir.list_responders("c", "s").await.unwrap(), expected);
                Ok(())
            })?;
        }
    }
}
