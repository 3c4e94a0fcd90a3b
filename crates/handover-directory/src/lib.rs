// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-mostly directories consulted when a session starts.
//!
//! - [`ContactDirectory`]: phone number to saved name and broadcast roles.
//! - [`AssignmentDirectory`]: `(category, subcategory)` to responder ids.

pub mod assignments;
pub mod contacts;

pub use assignments::AssignmentDirectory;
pub use contacts::ContactDirectory;
