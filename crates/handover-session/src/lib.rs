// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session bookkeeping for the Handover relay.
//!
//! [`SessionRegistry`] owns the `session_id <-> thread_id` correspondence in
//! the shared store. [`EscalationTimers`] owns the process-local reminder
//! pairs that nudge customers while no agent has replied.

pub mod registry;
pub mod timers;

pub use registry::SessionRegistry;
pub use timers::{EscalationTimers, ReminderSink, ReminderStage, TimerDelays};
