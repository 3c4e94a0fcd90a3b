// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry: forward (`session:{id}`) and reverse (`thread:{ts}`)
//! indices over the shared store.

use std::sync::Arc;
use std::time::Duration;

use handover_core::{HandoverError, KvStore, KvWrite, Session};
use handover_storage::keys;
use tracing::{debug, info, warn};

/// Creates, resolves and destroys sessions.
///
/// Both index entries are always written and removed in one
/// [`KvStore::write_batch`], so a reader never observes a session without
/// its reverse pointer or the other way round.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn KvStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Records a bare session linking `session_id` to `thread_id`.
    pub async fn create_session(
        &self,
        session_id: &str,
        thread_id: &str,
        customer_display_name: &str,
    ) -> Result<Session, HandoverError> {
        self.insert_session(Session::new(session_id, thread_id, customer_display_name))
            .await
    }

    /// Stores `session`, replacing any record with the same id.
    ///
    /// When the replaced record pointed at a different thread, that thread's
    /// reverse entry is dropped in the same batch so it cannot resolve to
    /// the new session.
    pub async fn insert_session(&self, session: Session) -> Result<Session, HandoverError> {
        let mut writes = Vec::with_capacity(3);

        if let Some(previous) = self.load(&session.session_id).await? {
            if previous.thread_id != session.thread_id {
                warn!(
                    session_id = %session.session_id,
                    old_thread = %previous.thread_id,
                    new_thread = %session.thread_id,
                    "session recreated on a new thread, dropping stale reverse index"
                );
                writes.push(KvWrite::delete(keys::thread_key(&previous.thread_id)));
            }
        }

        writes.push(KvWrite::set(
            keys::session_key(&session.session_id),
            serde_json::to_string(&session)?,
        ));
        writes.push(KvWrite::set(
            keys::thread_key(&session.thread_id),
            session.session_id.clone(),
        ));
        self.store.write_batch(writes).await?;

        info!(
            session_id = %session.session_id,
            thread_id = %session.thread_id,
            "session created"
        );
        Ok(session)
    }

    /// Marks `session_id` as being started. Only one caller across every
    /// relay process wins until [`release_claim`](Self::release_claim) or
    /// `ttl` expiry.
    pub async fn claim(&self, session_id: &str, ttl: Duration) -> Result<bool, HandoverError> {
        let claimed = self
            .store
            .set_if_absent(&keys::claim_key(session_id), "starting", ttl)
            .await?;
        if !claimed {
            debug!(%session_id, "start already claimed");
        }
        Ok(claimed)
    }

    pub async fn release_claim(&self, session_id: &str) -> Result<(), HandoverError> {
        self.store.delete(&keys::claim_key(session_id)).await
    }

    pub async fn get_by_session_id(&self, session_id: &str) -> Result<Session, HandoverError> {
        self.load(session_id)
            .await?
            .ok_or_else(|| HandoverError::not_found("session", session_id))
    }

    /// Resolves a thread back to its session through the reverse index.
    ///
    /// A missing pointer, a pointer to a missing record, and a pointer to a
    /// record that has since moved to another thread all count as not found.
    pub async fn get_by_thread_id(&self, thread_id: &str) -> Result<Session, HandoverError> {
        let not_found = || HandoverError::not_found("thread", thread_id);

        let Some(session_id) = self.store.get(&keys::thread_key(thread_id)).await? else {
            return Err(not_found());
        };
        match self.load(&session_id).await? {
            Some(session) if session.thread_id == thread_id => Ok(session),
            Some(_) | None => {
                debug!(%thread_id, %session_id, "reverse index points at no live session");
                Err(not_found())
            }
        }
    }

    /// Removes both index entries. Deleting an unknown session is a no-op.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), HandoverError> {
        let mut writes = vec![KvWrite::delete(keys::session_key(session_id))];

        match self.load(session_id).await? {
            Some(session) => {
                // Only drop the reverse pointer if it still names this session.
                let thread_key = keys::thread_key(&session.thread_id);
                if self.store.get(&thread_key).await?.as_deref() == Some(session_id) {
                    writes.push(KvWrite::delete(thread_key));
                }
            }
            None => {
                debug!(%session_id, "delete of unknown session");
                return Ok(());
            }
        }

        self.store.write_batch(writes).await?;
        info!(%session_id, "session deleted");
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>, HandoverError> {
        match self.store.get(&keys::session_key(session_id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_storage::MemoryStore;
    use proptest::prelude::*;

    fn registry() -> (SessionRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionRegistry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_then_resolve_both_directions() {
        let (registry, _) = registry();
        let created = registry
            .create_session("abc-123", "1700000000.000100", "Ana")
            .await
            .unwrap();

        let by_id = registry.get_by_session_id("abc-123").await.unwrap();
        assert_eq!(by_id, created);
        let by_thread = registry.get_by_thread_id("1700000000.000100").await.unwrap();
        assert_eq!(by_thread.session_id, "abc-123");
    }

    #[tokio::test]
    async fn delete_clears_both_directions_and_is_idempotent() {
        let (registry, store) = registry();
        registry.create_session("s1", "t1", "Ana").await.unwrap();

        registry.delete_session("s1").await.unwrap();
        assert!(registry.get_by_session_id("s1").await.unwrap_err().is_not_found());
        assert!(registry.get_by_thread_id("t1").await.unwrap_err().is_not_found());
        assert!(store.list_keys("").await.unwrap().is_empty());

        registry.delete_session("s1").await.unwrap();
        registry.delete_session("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn recreating_on_new_thread_drops_stale_reverse_entry() {
        let (registry, store) = registry();
        registry.create_session("s1", "t-old", "Ana").await.unwrap();
        registry.create_session("s1", "t-new", "Ana").await.unwrap();

        assert!(registry.get_by_thread_id("t-old").await.unwrap_err().is_not_found());
        assert_eq!(registry.get_by_thread_id("t-new").await.unwrap().session_id, "s1");
        assert_eq!(store.get("thread:t-old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_released() {
        let (registry, store) = registry();
        let ttl = Duration::from_secs(30);
        assert!(registry.claim("s1", ttl).await.unwrap());
        assert!(!registry.claim("s1", ttl).await.unwrap());
        assert!(registry.claim("s2", ttl).await.unwrap());

        registry.release_claim("s1").await.unwrap();
        assert_eq!(store.get("claim:s1").await.unwrap(), None);
        assert!(registry.claim("s1", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn dangling_reverse_pointer_is_not_found() {
        let (registry, store) = registry();
        store.set("thread:t9", "ghost").await.unwrap();
        let err = registry.get_by_thread_id("t9").await.unwrap_err();
        assert!(matches!(err, HandoverError::NotFound { entity: "thread", .. }));
    }

    #[tokio::test]
    async fn corrupt_record_is_a_storage_error() {
        let (registry, store) = registry();
        store.set("session:bad", "{not json").await.unwrap();
        let err = registry.get_by_session_id("bad").await.unwrap_err();
        assert!(matches!(err, HandoverError::Storage { .. }));
    }

    #[tokio::test]
    async fn decorated_session_round_trips() {
        let (registry, _) = registry();
        let session = Session::new("s2", "t2", "Bruno")
            .with_customer_phone("15551234567")
            .with_tags(Some("billing".into()), Some("refunds".into()));
        registry.insert_session(session.clone()).await.unwrap();
        assert_eq!(registry.get_by_thread_id("t2").await.unwrap(), session);
    }

    proptest! {
        #[test]
        fn index_round_trip(
            session_id in "[a-z0-9-]{1,24}",
            thread_id in "[0-9]{10}\\.[0-9]{6}",
            name in "\\PC{0,20}",
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (registry, _) = registry();
                registry.create_session(&session_id, &thread_id, &name).await.unwrap();
                let by_thread = registry.get_by_thread_id(&thread_id).await.unwrap();
                prop_assert_eq!(&by_thread.session_id, &session_id);
                let by_id = registry.get_by_session_id(&session_id).await.unwrap();
                prop_assert_eq!(&by_id.thread_id, &thread_id);
                prop_assert_eq!(&by_id.customer_display_name, &name);
                Ok(())
            })?;
        }
    }
}
