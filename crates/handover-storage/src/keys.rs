// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key layout of the shared store.
//!
//! | Key | Value |
//! |---|---|
//! | `session:{session_id}` | JSON session record |
//! | `thread:{thread_id}` | session id |
//! | `contact:{phone}` | JSON contact record |
//! | `roles` | set of role names |
//! | `assign:{category}:{subcategory}` | set of responder ids |
//! | `broadcast:{ts}` | JSON broadcast draft |
//! | `claim:{session_id}` | start-in-progress marker, expires |

pub const SESSION_PREFIX: &str = "session:";
pub const THREAD_PREFIX: &str = "thread:";
pub const CONTACT_PREFIX: &str = "contact:";
pub const ASSIGNMENT_PREFIX: &str = "assign:";
pub const BROADCAST_PREFIX: &str = "broadcast:";
pub const CLAIM_PREFIX: &str = "claim:";

/// Set of every defined role name.
pub const ROLES_KEY: &str = "roles";

pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

pub fn thread_key(thread_id: &str) -> String {
    format!("{THREAD_PREFIX}{thread_id}")
}

pub fn contact_key(phone: &str) -> String {
    format!("{CONTACT_PREFIX}{phone}")
}

/// Categories must not contain `:`; subcategories may.
pub fn assignment_key(category: &str, subcategory: &str) -> String {
    format!("{ASSIGNMENT_PREFIX}{category}:{subcategory}")
}

/// Splits an assignment key back into `(category, subcategory)`.
pub fn parse_assignment_key(key: &str) -> Option<(&str, &str)> {
    key.strip_prefix(ASSIGNMENT_PREFIX)?.split_once(':')
}

pub fn broadcast_key(ts: &str) -> String {
    format!("{BROADCAST_PREFIX}{ts}")
}

pub fn claim_key(session_id: &str) -> String {
    format!("{CLAIM_PREFIX}{session_id}")
}
