// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact and role directory.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use handover_core::types::canonical_phone;
use handover_core::{Contact, HandoverError, KvStore};
use handover_storage::keys;
use tracing::{debug, info, warn};

/// Saved customer identities and the role tags used to target broadcasts.
///
/// Every contact's roles are a subset of the defined role set: removing a
/// role strips it from every contact. That cascade reads every contact and
/// is linear in the size of the directory.
#[derive(Clone)]
pub struct ContactDirectory {
    store: Arc<dyn KvStore>,
}

/// Role names are compared trimmed and lowercased.
pub fn normalize_role(role: &str) -> String {
    role.trim().to_lowercase()
}

fn phone_key(phone: &str) -> Result<(String, String), HandoverError> {
    let canonical = canonical_phone(phone);
    if canonical.is_empty() {
        return Err(HandoverError::InvalidCommand(format!(
            "`{phone}` is not a phone number"
        )));
    }
    let key = keys::contact_key(&canonical);
    Ok((canonical, key))
}

impl ContactDirectory {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Contact, HandoverError> {
        let (canonical, key) = phone_key(phone)?;
        self.load(&key)
            .await?
            .ok_or_else(|| HandoverError::not_found("contact", canonical))
    }

    /// Saves `name` for `phone`, keeping any roles already assigned.
    pub async fn upsert_name(&self, phone: &str, name: &str) -> Result<Contact, HandoverError> {
        let (canonical, key) = phone_key(phone)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(HandoverError::InvalidCommand("contact name is empty".into()));
        }

        let roles = self
            .load(&key)
            .await?
            .map(|existing| existing.roles)
            .unwrap_or_default();
        let contact = Contact {
            phone: canonical,
            name: name.to_string(),
            roles,
            saved_at: Utc::now(),
        };
        self.save(&key, &contact).await?;
        info!(phone = %contact.phone, "contact saved");
        Ok(contact)
    }

    /// Replaces the roles of an existing contact.
    ///
    /// Roles that are not defined are dropped. Fails with `NotFound` when
    /// no contact is saved for `phone`.
    pub async fn set_roles(
        &self,
        phone: &str,
        roles: &BTreeSet<String>,
    ) -> Result<Contact, HandoverError> {
        let (canonical, key) = phone_key(phone)?;
        let Some(mut contact) = self.load(&key).await? else {
            return Err(HandoverError::not_found("contact", canonical));
        };

        let defined = self.store.set_members(keys::ROLES_KEY).await?;
        let (kept, unknown): (BTreeSet<String>, BTreeSet<String>) = roles
            .iter()
            .map(|r| normalize_role(r))
            .filter(|r| !r.is_empty())
            .partition(|r| defined.contains(r));
        if !unknown.is_empty() {
            warn!(phone = %canonical, ?unknown, "ignoring undefined roles");
        }

        contact.roles = kept;
        contact.saved_at = Utc::now();
        self.save(&key, &contact).await?;
        Ok(contact)
    }

    /// All contacts, sorted by name (case-insensitive), then phone.
    pub async fn list_all(&self) -> Result<Vec<Contact>, HandoverError> {
        let mut contacts = Vec::new();
        for key in self.store.list_keys(keys::CONTACT_PREFIX).await? {
            // A contact deleted between listing and reading is skipped.
            if let Some(contact) = self.load(&key).await? {
                contacts.push(contact);
            }
        }
        contacts.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.phone.cmp(&b.phone))
        });
        Ok(contacts)
    }

    /// Contacts holding at least one of `roles`, in [`list_all`](Self::list_all) order.
    pub async fn contacts_with_any_role(
        &self,
        roles: &BTreeSet<String>,
    ) -> Result<Vec<Contact>, HandoverError> {
        let roles: BTreeSet<String> = roles.iter().map(|r| normalize_role(r)).collect();
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|c| c.has_any_role(&roles))
            .collect())
    }

    /// Defines a role. Returns the normalized name.
    pub async fn add_role(&self, role: &str) -> Result<String, HandoverError> {
        let role = normalize_role(role);
        if role.is_empty() || role.contains(char::is_whitespace) {
            return Err(HandoverError::InvalidCommand(
                "role names must be a single non-empty word".into(),
            ));
        }
        self.store
            .set_add(keys::ROLES_KEY, std::slice::from_ref(&role))
            .await?;
        info!(%role, "role defined");
        Ok(role)
    }

    /// Removes a role and strips it from every contact holding it.
    ///
    /// Returns the number of contacts updated.
    pub async fn remove_role(&self, role: &str) -> Result<usize, HandoverError> {
        let role = normalize_role(role);
        self.store
            .set_remove(keys::ROLES_KEY, std::slice::from_ref(&role))
            .await?;

        let mut updated = 0;
        for key in self.store.list_keys(keys::CONTACT_PREFIX).await? {
            let Some(mut contact) = self.load(&key).await? else {
                continue;
            };
            if contact.roles.remove(&role) {
                self.save(&key, &contact).await?;
                updated += 1;
            }
        }
        info!(%role, updated, "role removed");
        Ok(updated)
    }

    pub async fn list_roles(&self) -> Result<Vec<String>, HandoverError> {
        Ok(self
            .store
            .set_members(keys::ROLES_KEY)
            .await?
            .into_iter()
            .collect())
    }

    async fn load(&self, key: &str) -> Result<Option<Contact>, HandoverError> {
        match self.store.get(key).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => {
                debug!(%key, "no contact");
                Ok(None)
            }
        }
    }

    async fn save(&self, key: &str, contact: &Contact) -> Result<(), HandoverError> {
        self.store.set(key, &serde_json::to_string(contact)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_storage::MemoryStore;

    fn directory() -> ContactDirectory {
        ContactDirectory::new(Arc::new(MemoryStore::new()))
    }

    fn roles(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn upsert_canonicalizes_phone_and_preserves_roles() {
        let dir = directory();
        dir.add_role("academy").await.unwrap();
        dir.upsert_name("+1 (555) 123-4567", "Ana").await.unwrap();
        dir.set_roles("15551234567", &roles(&["academy"])).await.unwrap();

        let renamed = dir.upsert_name("1-555-123-4567", "Ana María").await.unwrap();
        assert_eq!(renamed.phone, "15551234567");
        assert_eq!(renamed.name, "Ana María");
        assert_eq!(renamed.roles, roles(&["academy"]));
        assert_eq!(dir.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_missing_contact_is_not_found() {
        let dir = directory();
        let err = dir.find_by_phone("+44 20 7946 0958").await.unwrap_err();
        assert!(matches!(err, HandoverError::NotFound { entity: "contact", ref key } if key == "442079460958"));
    }

    #[tokio::test]
    async fn set_roles_on_unknown_contact_is_not_found() {
        let dir = directory();
        dir.add_role("vip").await.unwrap();
        let err = dir.set_roles("123", &roles(&["vip"])).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_roles_drops_undefined_roles() {
        let dir = directory();
        dir.add_role("vip").await.unwrap();
        dir.upsert_name("123", "Ana").await.unwrap();
        let contact = dir.set_roles("123", &roles(&["VIP", "ghost"])).await.unwrap();
        assert_eq!(contact.roles, roles(&["vip"]));
    }

    #[tokio::test]
    async fn remove_role_cascades_to_every_contact() {
        let dir = directory();
        dir.add_role("academy").await.unwrap();
        dir.add_role("vip").await.unwrap();
        for (phone, name) in [("1", "Ana"), ("2", "Bruno"), ("3", "Caro")] {
            dir.upsert_name(phone, name).await.unwrap();
        }
        dir.set_roles("1", &roles(&["academy", "vip"])).await.unwrap();
        dir.set_roles("2", &roles(&["academy"])).await.unwrap();

        let updated = dir.remove_role("academy").await.unwrap();
        assert_eq!(updated, 2);
        assert_eq!(dir.list_roles().await.unwrap(), vec!["vip"]);
        for contact in dir.list_all().await.unwrap() {
            assert!(!contact.roles.contains("academy"), "{contact:?}");
        }
        assert_eq!(dir.find_by_phone("1").await.unwrap().roles, roles(&["vip"]));
    }

    #[tokio::test]
    async fn list_all_sorts_case_insensitively() {
        let dir = directory();
        dir.upsert_name("1", "bruno").await.unwrap();
        dir.upsert_name("2", "Ana").await.unwrap();
        dir.upsert_name("3", "carla").await.unwrap();
        let names: Vec<_> = dir
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "bruno", "carla"]);
    }

    #[tokio::test]
    async fn contacts_with_any_role_filters() {
        let dir = directory();
        dir.add_role("academy").await.unwrap();
        dir.add_role("vip").await.unwrap();
        dir.upsert_name("1", "Ana").await.unwrap();
        dir.upsert_name("2", "Bruno").await.unwrap();
        dir.upsert_name("3", "Caro").await.unwrap();
        dir.set_roles("1", &roles(&["academy"])).await.unwrap();
        dir.set_roles("3", &roles(&["vip"])).await.unwrap();

        let targets = dir
            .contacts_with_any_role(&roles(&["academy", "vip"]))
            .await
            .unwrap();
        let phones: Vec<_> = targets.iter().map(|c| c.phone.as_str()).collect();
        assert_eq!(phones, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected() {
        let dir = directory();
        assert!(matches!(
            dir.upsert_name("no digits", "Ana").await.unwrap_err(),
            HandoverError::InvalidCommand(_)
        ));
        assert!(matches!(
            dir.upsert_name("123", "   ").await.unwrap_err(),
            HandoverError::InvalidCommand(_)
        ));
        assert!(matches!(
            dir.add_role("two words").await.unwrap_err(),
            HandoverError::InvalidCommand(_)
        ));
        assert_eq!(dir.add_role("  Academy ").await.unwrap(), "academy");
    }
}
