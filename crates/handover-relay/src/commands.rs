// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parser for the administrative slash command.

use handover_core::HandoverError;

/// A responder reference as typed by an admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    /// Escaped mention, `<@U123>` or `<@U123|name>`.
    Id(String),
    /// Bare `@handle`, resolved against the workspace member list.
    Handle(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Assign {
        category: String,
        subcategory: String,
        responders: Vec<Mention>,
    },
    /// An empty responder list clears the pair.
    Unassign {
        category: String,
        subcategory: String,
        responders: Vec<Mention>,
    },
    Assignments,
    RoleAdd(String),
    RoleRemove(String),
    Roles,
    Close(String),
    Help,
}

pub const USAGE: &str = "\
*Usage*
`assign <category> <subcategory> @user…` route a topic to responders
`unassign <category> <subcategory> [@user…]` remove responders, or clear the topic
`assignments` list every routed topic
`role add <name>` / `role remove <name>` manage broadcast roles
`roles` list roles
`close <session_id>` close a ticket
`help` show this message";

fn invalid(message: impl Into<String>) -> HandoverError {
    HandoverError::InvalidCommand(message.into())
}

/// Parses one mention token.
pub fn parse_mention(token: &str) -> Result<Mention, HandoverError> {
    if let Some(inner) = token.strip_prefix("<@").and_then(|t| t.strip_suffix('>')) {
        let id = inner.split('|').next().unwrap_or_default();
        if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(Mention::Id(id.to_string()));
        }
    } else if let Some(handle) = token.strip_prefix('@') {
        if !handle.is_empty() {
            return Ok(Mention::Handle(handle.to_string()));
        }
    }
    Err(invalid(format!("`{token}` is not a user mention")))
}

fn parse_topic<'a>(
    verb: &str,
    args: &mut impl Iterator<Item = &'a str>,
) -> Result<(String, String), HandoverError> {
    match (args.next(), args.next()) {
        (Some(category), Some(subcategory)) => Ok((category.to_string(), subcategory.to_string())),
        _ => Err(invalid(format!(
            "`{verb}` needs a category and a subcategory"
        ))),
    }
}

impl AdminCommand {
    /// Parses the text following the command name. Verbs are case-insensitive.
    pub fn parse(text: &str) -> Result<Self, HandoverError> {
        let mut args = text.split_whitespace();
        let verb = args.next().unwrap_or("help").to_lowercase();

        let command = match verb.as_str() {
            "help" => Self::Help,
            "assign" => {
                let (category, subcategory) = parse_topic("assign", &mut args)?;
                let responders = args.map(parse_mention).collect::<Result<Vec<_>, _>>()?;
                if responders.is_empty() {
                    return Err(invalid("`assign` needs at least one @user"));
                }
                Self::Assign {
                    category,
                    subcategory,
                    responders,
                }
            }
            "unassign" => {
                let (category, subcategory) = parse_topic("unassign", &mut args)?;
                let responders = args.map(parse_mention).collect::<Result<Vec<_>, _>>()?;
                Self::Unassign {
                    category,
                    subcategory,
                    responders,
                }
            }
            "assignments" => Self::Assignments,
            "roles" => Self::Roles,
            "role" => {
                let action = args.next().map(str::to_lowercase);
                let name = args.next();
                if args.next().is_some() {
                    return Err(invalid("role names must be a single word"));
                }
                match (action.as_deref(), name) {
                    (Some("add"), Some(name)) => Self::RoleAdd(name.to_string()),
                    (Some("remove"), Some(name)) => Self::RoleRemove(name.to_string()),
                    _ => return Err(invalid("use `role add <name>` or `role remove <name>`")),
                }
            }
            "close" => match (args.next(), args.next()) {
                (Some(session_id), None) => Self::Close(session_id.to_string()),
                _ => return Err(invalid("use `close <session_id>`")),
            },
            other => return Err(invalid(format!("unknown subcommand `{other}`"))),
        };

        Ok(command)
    }
}
