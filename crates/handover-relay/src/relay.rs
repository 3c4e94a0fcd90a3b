// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound event router.
//!
//! [`Relay`] is the only component that talks to every other one. It is
//! also the only place where typed errors are turned into boundary
//! acknowledgements or thread notices.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use handover_config::HandoverConfig;
use handover_core::types::{
    ChannelMessage, ChatEvent, ChatFile, EscalationRequest, MessagePayload, PostMessage,
    canonical_phone,
};
use handover_core::{
    AiPlatform, ChatPlatform, HandoverError, KvStore, MediaHost, MediaKind, Session,
};
use handover_directory::{AssignmentDirectory, ContactDirectory};
use handover_session::{EscalationTimers, SessionRegistry, TimerDelays};
use tracing::{debug, error, info, warn};

use crate::ack::RelayAck;
use crate::blocks;
use crate::reminders::BusyNotifier;
use crate::templates::{Notice, ThreadHeader, customer_line, display_phone};

/// Upper bound on how long a crashed start can block a retry of the same session.
const START_CLAIM_TTL: Duration = Duration::from_secs(60);

/// Channel and behaviour settings the router needs from configuration.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub support_channel: String,
    pub broadcast_channel: String,
    pub close_reaction: String,
    pub command: String,
    pub escalation_enabled: bool,
    pub busy_message: String,
    pub delays: TimerDelays,
}

impl From<&HandoverConfig> for RelaySettings {
    fn from(config: &HandoverConfig) -> Self {
        Self {
            support_channel: config.slack.support_channel.clone(),
            broadcast_channel: config.slack.broadcast_channel.clone(),
            close_reaction: config.slack.close_reaction.clone(),
            command: config.slack.command.clone(),
            escalation_enabled: config.escalation.enabled,
            busy_message: config.escalation.busy_message.clone(),
            delays: TimerDelays::from(&config.escalation),
        }
    }
}

/// Routes every inbound event to the registries and collaborators.
pub struct Relay {
    pub(crate) settings: RelaySettings,
    pub(crate) store: Arc<dyn KvStore>,
    pub(crate) sessions: SessionRegistry,
    pub(crate) contacts: ContactDirectory,
    pub(crate) assignments: AssignmentDirectory,
    pub(crate) timers: EscalationTimers,
    pub(crate) chat: Arc<dyn ChatPlatform>,
    pub(crate) ai: Arc<dyn AiPlatform>,
    pub(crate) media: Option<Arc<dyn MediaHost>>,
}

impl Relay {
    pub fn new(
        settings: RelaySettings,
        store: Arc<dyn KvStore>,
        chat: Arc<dyn ChatPlatform>,
        ai: Arc<dyn AiPlatform>,
        media: Option<Arc<dyn MediaHost>>,
    ) -> Self {
        let sessions = SessionRegistry::new(Arc::clone(&store));
        let notifier = BusyNotifier::new(
            Arc::clone(&ai),
            Arc::clone(&chat),
            settings.support_channel.clone(),
            settings.busy_message.clone(),
        );
        let timers = EscalationTimers::new(settings.delays, sessions.clone(), Arc::new(notifier));

        Self {
            contacts: ContactDirectory::new(Arc::clone(&store)),
            assignments: AssignmentDirectory::new(Arc::clone(&store)),
            sessions,
            timers,
            settings,
            store,
            chat,
            ai,
            media,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn contacts(&self) -> &ContactDirectory {
        &self.contacts
    }

    pub fn assignments(&self) -> &AssignmentDirectory {
        &self.assignments
    }

    pub fn timers(&self) -> &EscalationTimers {
        &self.timers
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Cancels every pending reminder.
    pub fn shutdown(&self) {
        self.timers.shutdown();
    }

    /// Opens a thread for a new escalation.
    pub async fn start(&self, request: EscalationRequest) -> RelayAck {
        let session_id = request.session_id.clone();
        match self.try_start(request).await {
            Ok(session) => RelayAck::ok("session created").with_thread(session.thread_id),
            Err(HandoverError::DuplicateSession(_)) => {
                warn!(%session_id, "duplicate start ignored");
                let ack = RelayAck::warning(format!("session {session_id} is already open"));
                match self.sessions.get_by_session_id(&session_id).await {
                    Ok(existing) => ack.with_thread(existing.thread_id),
                    Err(_) => ack,
                }
            }
            Err(e) => {
                error!(%session_id, error = %e, "start failed");
                RelayAck::error(format!("could not open a thread: {e}"))
            }
        }
    }

    /// Claims the session id, then re-checks for a live session, so two
    /// concurrent starts (in one process or several) open one thread.
    async fn try_start(&self, request: EscalationRequest) -> Result<Session, HandoverError> {
        let session_id = request.session_id.clone();
        if !self.sessions.claim(&session_id, START_CLAIM_TTL).await? {
            return Err(HandoverError::DuplicateSession(session_id));
        }
        let result = match self.sessions.get_by_session_id(&session_id).await {
            Ok(_) => Err(HandoverError::DuplicateSession(session_id.clone())),
            Err(e) if e.is_not_found() => self.open_thread(request).await,
            Err(e) => Err(e),
        };
        if let Err(e) = self.sessions.release_claim(&session_id).await {
            warn!(%session_id, error = %e, "could not release start claim");
        }
        result
    }

    async fn open_thread(&self, request: EscalationRequest) -> Result<Session, HandoverError> {

        let phone = canonical_phone(&request.phone);
        let responders = self
            .responders_for(request.category.as_deref(), request.subcategory.as_deref())
            .await;
        let name = self.display_name(&phone, request.name.as_deref()).await;

        let header = ThreadHeader {
            name: &name,
            phone: &phone,
            category: request.category.as_deref(),
            subcategory: request.subcategory.as_deref(),
            responders: &responders,
        }
        .to_string();
        let root = PostMessage::root(&self.settings.support_channel, &header)
            .with_blocks(blocks::encode(&blocks::thread_header(&header, &request.session_id))?);
        let posted = self.chat.post_message(root).await?;

        let session = Session::new(&request.session_id, &posted.ts, &name)
            .with_customer_phone(phone)
            .with_tags(request.category, request.subcategory);
        let session = match self.sessions.insert_session(session).await {
            Ok(session) => session,
            Err(e) => {
                self.post_notice(
                    &posted.ts,
                    Notice::ForwardFailed {
                        what: "ticket setup",
                        error: &e.to_string(),
                    },
                )
                .await;
                return Err(e);
            }
        };

        if self.settings.escalation_enabled {
            self.timers.schedule(&session.session_id);
        }
        Ok(session)
    }

    /// Responders are decoration only; a lookup failure leaves the ticket in the pool.
    async fn responders_for(
        &self,
        category: Option<&str>,
        subcategory: Option<&str>,
    ) -> BTreeSet<String> {
        let (Some(category), Some(subcategory)) = (category, subcategory) else {
            return BTreeSet::new();
        };
        self.assignments
            .list_responders(category, subcategory)
            .await
            .unwrap_or_else(|e| {
                warn!(%category, %subcategory, error = %e, "responder lookup failed");
                BTreeSet::new()
            })
    }

    /// A saved contact name wins over the profile name reported by the platform.
    async fn display_name(&self, phone: &str, profile_name: Option<&str>) -> String {
        let fallback = || {
            profile_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| display_phone(phone))
        };
        if phone.is_empty() {
            return fallback();
        }
        match self.contacts.find_by_phone(phone).await {
            Ok(contact) => contact.name,
            Err(e) if e.is_not_found() => fallback(),
            Err(e) => {
                warn!(%phone, error = %e, "contact lookup failed");
                fallback()
            }
        }
    }

    async fn inbound_session(&self, session_id: &str) -> Result<Session, RelayAck> {
        match self.sessions.get_by_session_id(session_id).await {
            Ok(session) => Ok(session),
            Err(e) if e.is_not_found() => {
                debug!(%session_id, "customer message for unknown session");
                Err(RelayAck::warning(format!("unknown session {session_id}")))
            }
            Err(e) => {
                error!(%session_id, error = %e, "session lookup failed");
                Err(RelayAck::error(format!("session lookup failed: {e}")))
            }
        }
    }

    /// Posts a customer message into the session's thread.
    pub async fn customer_message(&self, session_id: &str, payload: MessagePayload) -> RelayAck {
        let session = match self.inbound_session(session_id).await {
            Ok(session) => session,
            Err(ack) => return ack,
        };

        let text = customer_line(&session.customer_display_name, &payload);
        let reply = PostMessage::reply(&self.settings.support_channel, &session.thread_id, text);
        match self.chat.post_message(reply).await {
            Ok(_) => RelayAck::ok("delivered").with_thread(session.thread_id),
            Err(e) => {
                error!(%session_id, error = %e, "could not post customer message");
                RelayAck::error(format!("could not post to thread: {e}"))
            }
        }
    }

    /// Reports a customer message of a kind the thread cannot show.
    pub async fn unsupported_customer_message(&self, session_id: &str, kind: &str) -> RelayAck {
        let session = match self.inbound_session(session_id).await {
            Ok(session) => session,
            Err(ack) => return ack,
        };
        info!(%session_id, %kind, "unsupported customer message");
        self.post_notice(&session.thread_id, Notice::UnsupportedCustomerMessage { kind })
            .await;
        RelayAck::warning(format!("unsupported message type {kind}")).with_thread(session.thread_id)
    }

    /// Handles one chat-platform event. Failures are logged, never returned.
    pub async fn handle_event(&self, event: ChatEvent) {
        if let Err(e) = self.dispatch(event).await {
            if e.is_not_found() {
                debug!(error = %e, "event referred to nothing live");
            } else {
                error!(error = %e, "event handling failed");
            }
        }
    }

    async fn dispatch(&self, event: ChatEvent) -> Result<(), HandoverError> {
        match event {
            ChatEvent::Message(msg) => self.on_message(msg).await,
            ChatEvent::ReactionAdded {
                user,
                reaction,
                channel,
                item_ts,
                thread_ts,
            } => {
                if reaction != self.settings.close_reaction {
                    return Ok(());
                }
                let session = match thread_ts {
                    Some(thread) => self.sessions.get_by_thread_id(&thread).await?,
                    None => self.session_for_reacted(&channel, &item_ts).await?,
                };
                self.close(&session.session_id, Some(&user)).await?;
                Ok(())
            }
            ChatEvent::ButtonClicked {
                action_id,
                value,
                user,
                trigger_id,
                ..
            } => match action_id.as_str() {
                blocks::CLOSE_TICKET => {
                    self.close(&value, Some(&user)).await?;
                    Ok(())
                }
                blocks::SAVE_CONTACT => self.open_save_contact(&value, &trigger_id).await,
                blocks::EDIT_ROLES => self.open_edit_roles(&value, &trigger_id).await,
                blocks::BROADCAST_CHOOSE => self.open_broadcast_picker(&value, &trigger_id).await,
                other => {
                    debug!(action_id = %other, "ignoring unknown action");
                    Ok(())
                }
            },
            ChatEvent::ModalSubmitted {
                callback_id,
                private_metadata,
                user,
                values,
            } => match callback_id.as_str() {
                blocks::SAVE_CONTACT => self.save_contact(&private_metadata, &values).await,
                blocks::EDIT_ROLES => self.save_roles(&private_metadata, &user, &values).await,
                blocks::BROADCAST => self.send_broadcast(&private_metadata, &values).await,
                other => {
                    debug!(callback_id = %other, "ignoring unknown modal");
                    Ok(())
                }
            },
            ChatEvent::AppSurfaceOpened { user } => self.publish_home(&user).await,
        }
    }

    /// Reaction events name the reacted message only, which may be a reply
    /// deep inside a ticket thread.
    async fn session_for_reacted(&self, channel: &str, ts: &str) -> Result<Session, HandoverError> {
        match self.sessions.get_by_thread_id(ts).await {
            Err(e) if e.is_not_found() => {}
            other => return other,
        }
        match self.chat.thread_root(channel, ts).await? {
            Some(root) if root != ts => self.sessions.get_by_thread_id(&root).await,
            _ => Err(HandoverError::NotFound {
                entity: "thread",
                key: ts.to_string(),
            }),
        }
    }

    async fn on_message(&self, msg: ChannelMessage) -> Result<(), HandoverError> {
        if msg.is_from_bot() || msg.is_system_event() || msg.user.is_none() {
            return Ok(());
        }
        let reply_to = msg.thread_ts.clone().filter(|root| *root != msg.ts);
        match reply_to {
            Some(thread) => self.agent_reply(&thread, msg).await,
            None if msg.channel == self.settings.broadcast_channel => {
                self.draft_broadcast(msg).await
            }
            None => Ok(()),
        }
    }

    /// Forwards an agent's thread reply to the customer.
    async fn agent_reply(&self, thread: &str, msg: ChannelMessage) -> Result<(), HandoverError> {
        let session = match self.sessions.get_by_thread_id(thread).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => {
                debug!(%thread, "reply in unrelated thread");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let session_id = session.session_id.as_str();

        if self.timers.cancel(session_id) {
            info!(%session_id, "agent replied, reminders cancelled");
        }

        let text = msg.text.trim();
        if !text.is_empty() {
            if let Err(e) = self.ai.send_outbound(session_id, &MessagePayload::text(text)).await {
                error!(%session_id, error = %e, "could not forward agent reply");
                self.post_notice(
                    thread,
                    Notice::ForwardFailed {
                        what: "message",
                        error: &e.to_string(),
                    },
                )
                .await;
            }
        }

        for file in &msg.files {
            self.forward_file(&session, file).await;
        }
        Ok(())
    }

    async fn forward_file(&self, session: &Session, file: &ChatFile) {
        let thread = session.thread_id.as_str();
        let kind = match MediaKind::from_mimetype(&file.mimetype) {
            Ok(kind) => kind,
            Err(_) => {
                info!(session_id = %session.session_id, mimetype = %file.mimetype, "dropping unsupported attachment");
                self.post_notice(
                    thread,
                    Notice::UnsupportedMedia {
                        file_name: &file.name,
                        mimetype: &file.mimetype,
                    },
                )
                .await;
                return;
            }
        };
        let Some(media) = &self.media else {
            self.post_notice(thread, Notice::MediaUnavailable { file_name: &file.name })
                .await;
            return;
        };

        let result = async {
            let bytes = self.chat.download_file(&file.url_private).await?;
            let url = media.upload(bytes, kind, &file.name).await?;
            self.ai
                .send_outbound(&session.session_id, &MessagePayload::media(kind, url))
                .await
        }
        .await;

        if let Err(e) = result {
            error!(session_id = %session.session_id, file = %file.name, error = %e, "could not forward attachment");
            self.post_notice(
                thread,
                Notice::ForwardFailed {
                    what: "attachment",
                    error: &e.to_string(),
                },
            )
            .await;
        }
    }

    /// Ends a session. Returns `false` when no such session was open.
    ///
    /// The session is removed even if the AI platform rejects the
    /// disconnect; the failure is reported into the thread.
    pub async fn close(&self, session_id: &str, by: Option<&str>) -> Result<bool, HandoverError> {
        let session = match self.sessions.get_by_session_id(session_id).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => {
                debug!(%session_id, "close of unknown session");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        self.timers.cancel(session_id);
        let disconnected = self.ai.disconnect(session_id).await;
        self.sessions.delete_session(session_id).await?;
        info!(%session_id, by = by.unwrap_or("-"), "session closed");

        if let Err(e) = &disconnected {
            error!(%session_id, error = %e, "disconnect failed");
            self.post_notice(
                &session.thread_id,
                Notice::CloseDisconnectFailed {
                    error: &e.to_string(),
                },
            )
            .await;
        }
        self.post_notice(&session.thread_id, Notice::Closed { by }).await;

        let summary = format!(
            ":lock: Conversation with *{}* ({}) is closed.",
            session.customer_display_name,
            display_phone(session.customer_phone.as_deref().unwrap_or_default())
        );
        if let Err(e) = self
            .chat
            .update_message(
                &self.settings.support_channel,
                &session.thread_id,
                &summary,
                blocks::encode(&blocks::closed_thread_header(&summary)).ok(),
            )
            .await
        {
            warn!(%session_id, error = %e, "could not update thread header");
        }
        Ok(true)
    }

    /// Best-effort reply in a support thread.
    pub(crate) async fn post_notice(&self, thread: &str, notice: Notice<'_>) {
        self.post_reply(&self.settings.support_channel, thread, &notice.to_string())
            .await;
    }

    pub(crate) async fn post_reply(&self, channel: &str, thread: &str, text: &str) {
        let reply = PostMessage::reply(channel, thread, text);
        if let Err(e) = self.chat.post_message(reply).await {
            warn!(%channel, %thread, error = %e, "could not post notice");
        }
    }
}
