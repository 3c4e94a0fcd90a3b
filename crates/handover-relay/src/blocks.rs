// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block Kit layouts: thread header, broadcast prompt, modals and the home tab.
//!
//! Layouts are built as typed `slack-morphism` blocks and views, then
//! [`encode`]d for the chat-platform boundary.

use handover_core::{Contact, HandoverError};
use serde::Serialize;
use serde_json::Value;
use slack_morphism::prelude::*;

use crate::templates::display_phone;

pub const CLOSE_TICKET: &str = "close_ticket";
pub const SAVE_CONTACT: &str = "save_contact";
pub const EDIT_ROLES: &str = "edit_roles";
pub const BROADCAST_CHOOSE: &str = "broadcast_choose";
pub const BROADCAST: &str = "broadcast";

/// Action id of the name input in the save-contact modal.
pub const NAME_INPUT: &str = "name";
/// Action id of the role multi-select in the edit-roles and broadcast modals.
pub const ROLES_INPUT: &str = "roles";

const ROLES_BLOCK: &str = "roles_block";
const NAME_BLOCK: &str = "name_block";

/// Home tab and modal block limit is 100; leave room for headers.
const MAX_HOME_CONTACTS: usize = 90;

/// Serializes a layout for [`ChatPlatform`](handover_core::ChatPlatform) calls.
pub fn encode<T: Serialize>(layout: &T) -> Result<Value, HandoverError> {
    Ok(serde_json::to_value(layout)?)
}

fn plain(text: &str) -> SlackBlockPlainTextOnly {
    SlackBlockPlainText::new(text.to_string()).into()
}

fn mrkdwn(text: &str) -> SlackBlockText {
    SlackBlockMarkDownText::new(text.to_string()).into()
}

fn section(text: &str) -> SlackSectionBlock {
    SlackSectionBlock::new().with_text(mrkdwn(text))
}

fn button(action_id: &str, label: &str, value: &str) -> SlackBlockButtonElement {
    SlackBlockButtonElement::new(SlackActionId(action_id.to_string()), plain(label))
        .with_value(value.to_string())
}

fn actions(buttons: Vec<SlackBlockButtonElement>) -> SlackBlock {
    SlackBlock::Actions(SlackActionsBlock::new(
        buttons.into_iter().map(SlackActionBlockElement::Button).collect(),
    ))
}

fn context(text: &str) -> SlackBlock {
    SlackBlock::Context(SlackContextBlock::new(vec![SlackContextBlockElement::MarkDown(
        SlackBlockMarkDownText::new(text.to_string()),
    )]))
}

fn role_option(role: &str) -> SlackBlockChoiceItem<SlackBlockPlainTextOnly> {
    SlackBlockChoiceItem::new(plain(role), role.to_string())
}

fn role_select(roles: &[String]) -> SlackBlockMultiStaticSelectElement {
    SlackBlockMultiStaticSelectElement::new(SlackActionId(ROLES_INPUT.to_string()))
        .with_placeholder(plain("Select roles"))
        .with_options(roles.iter().map(|r| role_option(r)).collect())
}

fn input(block_id: &str, label: &str, element: SlackInputBlockElement) -> SlackInputBlock {
    SlackInputBlock::new(plain(label), element).with_block_id(SlackBlockId(block_id.to_string()))
}

fn modal(
    callback_id: &str,
    title: &str,
    metadata: &str,
    submit: Option<&str>,
    blocks: Vec<SlackBlock>,
) -> SlackView {
    let mut view = SlackModalView::new(plain(title), blocks)
        .with_callback_id(SlackCallbackId(callback_id.to_string()))
        .with_private_metadata(metadata.to_string())
        .with_close(plain("Cancel"));
    view.submit = submit.map(plain);
    SlackView::Modal(view)
}

/// Root message of a session thread, with close and save-contact buttons.
pub fn thread_header(text: &str, session_id: &str) -> Vec<SlackBlock> {
    vec![
        SlackBlock::Section(section(text)),
        actions(vec![
            button(CLOSE_TICKET, "Close ticket", session_id),
            button(SAVE_CONTACT, "Save contact", session_id),
        ]),
    ]
}

/// Header after closing: the same text, buttons removed.
pub fn closed_thread_header(text: &str) -> Vec<SlackBlock> {
    vec![SlackBlock::Section(section(text)), context("Closed")]
}

pub fn broadcast_prompt(text: &str, draft_ts: &str) -> Vec<SlackBlock> {
    vec![
        SlackBlock::Section(section(text)),
        actions(vec![button(BROADCAST_CHOOSE, "Choose roles", draft_ts)]),
    ]
}

/// Role picker for a broadcast draft. `roles` must not be empty.
pub fn broadcast_modal(draft_ts: &str, preview: &str, roles: &[String]) -> SlackView {
    modal(
        BROADCAST,
        "Broadcast",
        draft_ts,
        Some("Send"),
        vec![
            SlackBlock::Section(section(&format!("*Message*\n>{preview}"))),
            SlackBlock::Input(input(
                ROLES_BLOCK,
                "Send to contacts with any of these roles",
                SlackInputBlockElement::MultiStaticSelect(role_select(roles)),
            )),
        ],
    )
}

pub fn save_contact_modal(session_id: &str, phone: &str, initial_name: &str) -> SlackView {
    let name = SlackBlockPlainTextInputElement::new(SlackActionId(NAME_INPUT.to_string()))
        .with_initial_value(initial_name.to_string());
    modal(
        SAVE_CONTACT,
        "Save contact",
        session_id,
        Some("Save"),
        vec![
            SlackBlock::Section(section(&format!(
                "Name to remember for {}",
                display_phone(phone)
            ))),
            SlackBlock::Input(input(
                NAME_BLOCK,
                "Name",
                SlackInputBlockElement::PlainTextInput(name),
            )),
        ],
    )
}

pub fn edit_roles_modal(contact: &Contact, roles: &[String]) -> SlackView {
    let intro = SlackBlock::Section(section(&format!(
        "Roles for *{}* ({})",
        contact.name,
        display_phone(&contact.phone)
    )));
    if roles.is_empty() {
        return modal(
            EDIT_ROLES,
            "Edit roles",
            &contact.phone,
            None,
            vec![
                intro,
                SlackBlock::Section(section(
                    "No roles are defined yet. Add one with `/handover role add <name>`.",
                )),
            ],
        );
    }

    let mut select = role_select(roles);
    let current: Vec<_> = roles
        .iter()
        .filter(|r| contact.roles.contains(*r))
        .map(|r| role_option(r))
        .collect();
    if !current.is_empty() {
        select = select.with_initial_options(current);
    }

    modal(
        EDIT_ROLES,
        "Edit roles",
        &contact.phone,
        Some("Save"),
        vec![
            intro,
            SlackBlock::Input(
                input(
                    ROLES_BLOCK,
                    "Roles",
                    SlackInputBlockElement::MultiStaticSelect(select),
                )
                .with_optional(true),
            ),
        ],
    )
}

/// Home tab listing roles and saved contacts.
pub fn home_view(roles: &[String], contacts: &[Contact]) -> SlackView {
    let role_text = if roles.is_empty() {
        "_none defined_".to_string()
    } else {
        roles.iter().map(|r| format!("`{r}`")).collect::<Vec<_>>().join(" ")
    };

    let mut blocks = vec![
        SlackBlock::Header(SlackHeaderBlock::new(plain("Contact directory"))),
        SlackBlock::Section(section(&format!("*Roles:* {role_text}"))),
        SlackBlock::Divider(SlackDividerBlock::new()),
    ];

    if contacts.is_empty() {
        blocks.push(SlackBlock::Section(section(
            "No contacts saved yet. Use *Save contact* in a ticket thread.",
        )));
    }
    for contact in contacts.iter().take(MAX_HOME_CONTACTS) {
        let tags = if contact.roles.is_empty() {
            "no roles".to_string()
        } else {
            contact.roles.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let row = section(&format!(
            "*{}*  {}\n{tags}",
            contact.name,
            display_phone(&contact.phone)
        ))
        .with_accessory(SlackSectionBlockElement::Button(button(
            EDIT_ROLES,
            "Edit roles",
            &contact.phone,
        )));
        blocks.push(SlackBlock::Section(row));
    }
    if contacts.len() > MAX_HOME_CONTACTS {
        blocks.push(context(&format!(
            "Showing {MAX_HOME_CONTACTS} of {} contacts.",
            contacts.len()
        )));
    }

    SlackView::Home(SlackHomeView::new(blocks))
}
