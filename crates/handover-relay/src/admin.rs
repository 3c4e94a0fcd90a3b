// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-facing administration: the slash command, the contact modals and
//! the directory home view.

use std::collections::{BTreeMap, BTreeSet};

use handover_core::types::{ChatUser, FieldValue, SlashCommand};
use handover_core::HandoverError;
use handover_directory::contacts::normalize_role;
use tracing::{debug, error, info};

use crate::blocks;
use crate::broadcast::selected_options;
use crate::commands::{AdminCommand, Mention, USAGE};
use crate::relay::Relay;
use crate::templates::{Notice, mentions};

fn topic(category: &str, subcategory: &str) -> String {
    format!("`{category} › {subcategory}`")
}

fn find_handle<'a>(users: &'a [ChatUser], handle: &str) -> Option<&'a ChatUser> {
    users.iter().find(|u| {
        u.handle.eq_ignore_ascii_case(handle) || u.display_name.eq_ignore_ascii_case(handle)
    })
}

impl Relay {
    /// Runs a slash command and returns the reply shown to the invoking user.
    pub async fn handle_command(&self, command: SlashCommand) -> String {
        debug!(user = %command.user, text = %command.text, "admin command");
        let parsed = match AdminCommand::parse(&command.text) {
            Ok(parsed) => parsed,
            Err(e) => return reply_for_error(&e),
        };
        match self.run_command(parsed, &command.user).await {
            Ok(reply) => reply,
            Err(e) => reply_for_error(&e),
        }
    }

    async fn run_command(&self, command: AdminCommand, user: &str) -> Result<String, HandoverError> {
        let reply = match command {
            AdminCommand::Help => USAGE.to_string(),
            AdminCommand::Assign {
                category,
                subcategory,
                responders,
            } => {
                let ids = self.resolve_mentions(&responders).await?;
                self.assignments
                    .add_responders(&category, &subcategory, &ids)
                    .await?;
                let ids: BTreeSet<String> = ids.into_iter().collect();
                format!(
                    "Assigned {} to {}.",
                    mentions(&ids),
                    topic(&category, &subcategory)
                )
            }
            AdminCommand::Unassign {
                category,
                subcategory,
                responders,
            } => {
                let ids = self.resolve_mentions(&responders).await?;
                self.assignments
                    .remove_responders(&category, &subcategory, &ids)
                    .await?;
                if ids.is_empty() {
                    format!("Cleared every responder from {}.", topic(&category, &subcategory))
                } else {
                    let ids: BTreeSet<String> = ids.into_iter().collect();
                    format!(
                        "Removed {} from {}.",
                        mentions(&ids),
                        topic(&category, &subcategory)
                    )
                }
            }
            AdminCommand::Assignments => {
                let all = self.assignments.list_all().await?;
                if all.is_empty() {
                    "No topics are assigned yet.".to_string()
                } else {
                    all.iter()
                        .map(|((category, subcategory), ids)| {
                            format!("{} → {}", topic(category, subcategory), mentions(ids))
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            AdminCommand::RoleAdd(role) => {
                let role = self.contacts.add_role(&role).await?;
                format!("Role `{role}` is defined.")
            }
            AdminCommand::RoleRemove(role) => {
                let updated = self.contacts.remove_role(&role).await?;
                format!("Role `{}` removed from {updated} contact(s).", normalize_role(&role))
            }
            AdminCommand::Roles => {
                let roles = self.contacts.list_roles().await?;
                if roles.is_empty() {
                    "No roles are defined yet.".to_string()
                } else {
                    let roles: Vec<String> = roles.iter().map(|r| format!("`{r}`")).collect();
                    format!("Roles: {}", roles.join(" "))
                }
            }
            AdminCommand::Close(session_id) => {
                if self.close(&session_id, Some(user)).await? {
                    format!("Closed session `{session_id}`.")
                } else {
                    format!("No open session `{session_id}`.")
                }
            }
        };
        Ok(reply)
    }

    /// Turns mentions into user ids. Handles are looked up once per command.
    async fn resolve_mentions(&self, mentions: &[Mention]) -> Result<Vec<String>, HandoverError> {
        let mut users: Option<Vec<ChatUser>> = None;
        let mut ids = Vec::with_capacity(mentions.len());
        for mention in mentions {
            let id = match mention {
                Mention::Id(id) => id.clone(),
                Mention::Handle(handle) => {
                    if users.is_none() {
                        users = Some(self.chat.list_users().await?);
                    }
                    let found = users.as_deref().and_then(|u| find_handle(u, handle));
                    match found {
                        Some(user) => user.id.clone(),
                        None => {
                            return Err(HandoverError::InvalidCommand(format!(
                                "no workspace member is called @{handle}"
                            )));
                        }
                    }
                }
            };
            ids.push(id);
        }
        Ok(ids)
    }

    pub(crate) async fn open_save_contact(
        &self,
        session_id: &str,
        trigger_id: &str,
    ) -> Result<(), HandoverError> {
        let session = self.sessions.get_by_session_id(session_id).await?;
        let Some(phone) = session.customer_phone.as_deref().filter(|p| !p.is_empty()) else {
            return Err(HandoverError::InvalidCommand(format!(
                "session {session_id} has no customer phone"
            )));
        };
        let name = match self.contacts.find_by_phone(phone).await {
            Ok(contact) => contact.name,
            Err(e) if e.is_not_found() => session.customer_display_name.clone(),
            Err(e) => return Err(e),
        };
        let view = blocks::save_contact_modal(session_id, phone, &name);
        self.chat.open_modal(trigger_id, blocks::encode(&view)?).await
    }

    pub(crate) async fn save_contact(
        &self,
        session_id: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), HandoverError> {
        let session = self.sessions.get_by_session_id(session_id).await?;
        let phone = session.customer_phone.as_deref().unwrap_or_default();
        let name = match values.get(blocks::NAME_INPUT) {
            Some(FieldValue::Text(name)) => name.as_str(),
            _ => "",
        };
        let contact = self.contacts.upsert_name(phone, name).await?;
        self.post_notice(
            &session.thread_id,
            Notice::ContactSaved {
                name: &contact.name,
                phone: &contact.phone,
            },
        )
        .await;
        Ok(())
    }

    pub(crate) async fn open_edit_roles(
        &self,
        phone: &str,
        trigger_id: &str,
    ) -> Result<(), HandoverError> {
        let contact = self.contacts.find_by_phone(phone).await?;
        let roles = self.contacts.list_roles().await?;
        let view = blocks::edit_roles_modal(&contact, &roles);
        self.chat.open_modal(trigger_id, blocks::encode(&view)?).await
    }

    pub(crate) async fn save_roles(
        &self,
        phone: &str,
        user: &str,
        values: &BTreeMap<String, FieldValue>,
    ) -> Result<(), HandoverError> {
        let roles = selected_options(values, blocks::ROLES_INPUT);
        let contact = self.contacts.set_roles(phone, &roles).await?;
        info!(phone = %contact.phone, roles = ?contact.roles, %user, "contact roles updated");
        self.publish_home(user).await
    }

    pub(crate) async fn publish_home(&self, user: &str) -> Result<(), HandoverError> {
        let roles = self.contacts.list_roles().await?;
        let contacts = self.contacts.list_all().await?;
        let view = blocks::home_view(&roles, &contacts);
        self.chat.publish_view(user, blocks::encode(&view)?).await
    }
}

fn reply_for_error(err: &HandoverError) -> String {
    match err {
        HandoverError::InvalidCommand(message) => format!("{message}\n\n{USAGE}"),
        other => {
            error!(error = %other, "admin command failed");
            format!(":x: {other}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_match_name_or_display_name() {
        let users = vec![
            ChatUser {
                id: "U1".into(),
                handle: "ana".into(),
                display_name: "Ana Lima".into(),
            },
            ChatUser {
                id: "U2".into(),
                handle: "bruno.s".into(),
                display_name: "Bruno".into(),
            },
        ];
        assert_eq!(find_handle(&users, "ANA").map(|u| u.id.as_str()), Some("U1"));
        assert_eq!(find_handle(&users, "bruno").map(|u| u.id.as_str()), Some("U2"));
        assert!(find_handle(&users, "carla").is_none());
    }

    #[test]
    fn invalid_commands_include_usage() {
        let reply = reply_for_error(&HandoverError::InvalidCommand("unknown subcommand `x`".into()));
        assert!(reply.starts_with("unknown subcommand `x`"));
        assert!(reply.contains("*Usage*"));
    }
}
