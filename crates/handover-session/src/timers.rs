// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-escalation timers.
//!
//! Each session gets at most one live pair of one-shot reminders. Both are
//! tied to a single [`CancellationToken`], so cancelling the pair is one
//! operation. Timers live only in this process and are lost on restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use handover_config::model::EscalationConfig;
use handover_core::{HandoverError, Session};
use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::registry::SessionRegistry;

/// Which of the two reminders fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReminderStage {
    First,
    Second,
}

/// Receives reminders for sessions that are still open when a timer fires.
#[async_trait]
pub trait ReminderSink: Send + Sync + 'static {
    async fn remind(&self, session: &Session, stage: ReminderStage) -> Result<(), HandoverError>;
}

/// Delays from scheduling time to each reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerDelays {
    pub first: Duration,
    pub second: Duration,
}

impl Default for TimerDelays {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(180),
            second: Duration::from_secs(600),
        }
    }
}

impl From<&EscalationConfig> for TimerDelays {
    fn from(config: &EscalationConfig) -> Self {
        Self {
            first: Duration::from_secs(config.first_reminder_secs),
            second: Duration::from_secs(config.second_reminder_secs),
        }
    }
}

#[derive(Debug)]
struct TimerPair {
    token: CancellationToken,
    generation: u64,
}

/// Schedules and cancels reminder pairs keyed by session id.
pub struct EscalationTimers {
    delays: TimerDelays,
    registry: SessionRegistry,
    sink: Arc<dyn ReminderSink>,
    pending: Arc<DashMap<String, TimerPair>>,
    generation: AtomicU64,
    root: CancellationToken,
}

impl EscalationTimers {
    pub fn new(
        delays: TimerDelays,
        registry: SessionRegistry,
        sink: Arc<dyn ReminderSink>,
    ) -> Self {
        Self {
            delays,
            registry,
            sink,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Starts a reminder pair for `session_id`.
    ///
    /// An existing pair for the same session is cancelled and replaced.
    pub fn schedule(&self, session_id: &str) {
        let token = self.root.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let previous = self.pending.insert(
            session_id.to_string(),
            TimerPair {
                token: token.clone(),
                generation,
            },
        );
        if let Some(previous) = previous {
            debug!(%session_id, "replacing existing reminder pair");
            previous.token.cancel();
        }

        self.spawn_reminder(session_id, ReminderStage::First, self.delays.first, &token, None);
        self.spawn_reminder(
            session_id,
            ReminderStage::Second,
            self.delays.second,
            &token,
            Some(generation),
        );
        debug!(%session_id, "reminders scheduled");
    }

    /// Cancels both reminders. Returns `false` when none were pending.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.pending.remove(session_id) {
            Some((_, pair)) => {
                pair.token.cancel();
                debug!(%session_id, "reminders cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, session_id: &str) -> bool {
        self.pending.contains_key(session_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cancels every pending reminder.
    pub fn shutdown(&self) {
        self.root.cancel();
        self.pending.clear();
    }

    /// `last_generation` is set on the final timer of a pair, which clears the
    /// map entry once it has run, unless the pair was replaced meanwhile.
    fn spawn_reminder(
        &self,
        session_id: &str,
        stage: ReminderStage,
        delay: Duration,
        token: &CancellationToken,
        last_generation: Option<u64>,
    ) {
        let session_id = session_id.to_string();
        let token = token.clone();
        let registry = self.registry.clone();
        let sink = Arc::clone(&self.sink);
        let pending = Arc::clone(&self.pending);

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            fire(&registry, sink.as_ref(), &session_id, stage, &token).await;

            if let Some(generation) = last_generation {
                pending.remove_if(&session_id, |_, pair| pair.generation == generation);
            }
        });
    }
}

impl Drop for EscalationTimers {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn fire(
    registry: &SessionRegistry,
    sink: &dyn ReminderSink,
    session_id: &str,
    stage: ReminderStage,
    token: &CancellationToken,
) {
    let session = match registry.get_by_session_id(session_id).await {
        Ok(session) => session,
        Err(e) if e.is_not_found() => {
            debug!(%session_id, %stage, "reminder for closed session skipped");
            return;
        }
        Err(e) => {
            error!(%session_id, %stage, error = %e, "reminder could not load session");
            return;
        }
    };

    if token.is_cancelled() {
        debug!(%session_id, %stage, "reminder cancelled while loading session");
        return;
    }

    match sink.remind(&session, stage).await {
        Ok(()) => info!(%session_id, %stage, "reminder sent"),
        Err(e) => error!(%session_id, %stage, error = %e, "reminder failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handover_storage::MemoryStore;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingSink {
        fired: Mutex<Vec<(String, ReminderStage)>>,
        fail_first: bool,
    }

    impl RecordingSink {
        fn fired(&self) -> Vec<(String, ReminderStage)> {
            self.fired.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReminderSink for RecordingSink {
        async fn remind(
            &self,
            session: &Session,
            stage: ReminderStage,
        ) -> Result<(), HandoverError> {
            self.fired
                .lock()
                .unwrap()
                .push((session.session_id.clone(), stage));
            if self.fail_first && stage == ReminderStage::First {
                return Err(HandoverError::Internal("ai platform down".into()));
            }
            Ok(())
        }
    }

    async fn setup(sink: RecordingSink) -> (EscalationTimers, Arc<RecordingSink>, SessionRegistry) {
        let registry = SessionRegistry::new(Arc::new(MemoryStore::new()));
        registry.create_session("abc-123", "t1", "Ana").await.unwrap();
        let sink = Arc::new(sink);
        let timers = EscalationTimers::new(TimerDelays::default(), registry.clone(), sink.clone());
        (timers, sink, registry)
    }

    async fn advance(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn both_reminders_fire_once_in_order() {
        let (timers, sink, _) = setup(RecordingSink::default()).await;
        timers.schedule("abc-123");
        assert!(timers.is_scheduled("abc-123"));

        advance(179).await;
        assert!(sink.fired().is_empty());

        advance(2).await;
        assert_eq!(sink.fired(), vec![("abc-123".to_string(), ReminderStage::First)]);

        advance(420).await;
        assert_eq!(
            sink.fired(),
            vec![
                ("abc-123".to_string(), ReminderStage::First),
                ("abc-123".to_string(), ReminderStage::Second),
            ]
        );
        assert!(!timers.is_scheduled("abc-123"));

        advance(3600).await;
        assert_eq!(sink.fired().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_fire_sends_nothing() {
        let (timers, sink, _) = setup(RecordingSink::default()).await;
        timers.schedule("abc-123");
        assert!(timers.cancel("abc-123"));
        assert!(!timers.cancel("abc-123"));

        advance(900).await;
        assert!(sink.fired().is_empty());
        assert_eq!(timers.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_between_reminders_stops_the_second() {
        let (timers, sink, _) = setup(RecordingSink::default()).await;
        timers.schedule("abc-123");
        advance(200).await;
        timers.cancel("abc-123");
        advance(900).await;
        assert_eq!(sink.fired(), vec![("abc-123".to_string(), ReminderStage::First)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_previous_pair() {
        let (timers, sink, _) = setup(RecordingSink::default()).await;
        timers.schedule("abc-123");
        advance(100).await;
        timers.schedule("abc-123");
        assert_eq!(timers.pending_count(), 1);

        // The first pair would have fired at 180s.
        advance(100).await;
        assert!(sink.fired().is_empty());

        advance(81).await;
        assert_eq!(sink.fired(), vec![("abc-123".to_string(), ReminderStage::First)]);

        advance(1000).await;
        assert_eq!(sink.fired().len(), 2);
        assert!(!timers.is_scheduled("abc-123"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn reminder_for_closed_session_is_a_quiet_no_op() {
        let (timers, sink, registry) = setup(RecordingSink::default()).await;
        timers.schedule("abc-123");
        registry.delete_session("abc-123").await.unwrap();

        advance(900).await;
        assert!(sink.fired().is_empty());
        assert!(logs_contain("reminder for closed session skipped"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn failed_first_reminder_does_not_stop_the_second() {
        let (timers, sink, _) = setup(RecordingSink {
            fail_first: true,
            ..RecordingSink::default()
        })
        .await;
        timers.schedule("abc-123");

        advance(900).await;
        assert_eq!(sink.fired().len(), 2);
        assert!(logs_contain("reminder failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_everything() {
        let (timers, sink, registry) = setup(RecordingSink::default()).await;
        registry.create_session("def-456", "t2", "Bruno").await.unwrap();
        timers.schedule("abc-123");
        timers.schedule("def-456");

        timers.shutdown();
        advance(900).await;
        assert!(sink.fired().is_empty());
    }

    #[test]
    fn delays_follow_config() {
        let config = EscalationConfig {
            first_reminder_secs: 30,
            second_reminder_secs: 90,
            ..EscalationConfig::default()
        };
        let delays = TimerDelays::from(&config);
        assert_eq!(delays.first, Duration::from_secs(30));
        assert_eq!(delays.second, Duration::from_secs(90));
        assert_eq!(TimerDelays::default().first, Duration::from_secs(180));
    }
}
