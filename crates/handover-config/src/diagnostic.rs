// SPDX-FileCopyrightText: 2026 Handover Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Converts Figment deserialization errors into miette diagnostics with
//! source spans, valid key listings, and "did you mean?" suggestions using
//! Jaro-Winkler string similarity. Type errors on credential keys never
//! echo the offending value.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Keys whose values are credentials; type errors never echo them.
const SECRET_KEYS: &[&str] = &["bot_token", "api_key", "redis_url"];

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in a configuration section.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(handover::config::unknown_key),
        help("{}", format_unknown_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is similar enough.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A top-level table that is not one of the known sections.
    #[error("unknown configuration section `[{section}]`")]
    #[diagnostic(
        code(handover::config::unknown_section),
        help("{}", format_unknown_help(suggestion.as_deref(), valid_sections))
    )]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        valid_sections: String,
        #[label("this section is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(
        code(handover::config::invalid_type),
        help("{}", format_invalid_type_help(expected, env_var.as_deref()))
    )]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        /// Environment variable that supplied the value, when it came from one.
        env_var: Option<String>,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(handover::config::missing_key),
        help("add `{key} = <value>` to handover.toml or set {}", env_var_for(key))
    )]
    MissingKey { key: String },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(handover::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(handover::config::other))]
    Other(String),
}

fn format_unknown_help(suggestion: Option<&str>, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid}"),
        None => format!("valid keys: {valid}"),
    }
}

fn format_invalid_type_help(expected: &str, env_var: Option<&str>) -> String {
    match env_var {
        Some(var) => format!("expected {expected}; the value came from {var}"),
        None => format!("expected {expected}"),
    }
}

/// Environment variable that overrides a dotted key: `slack.bot_token`
/// becomes `HANDOVER_SLACK_BOT_TOKEN`.
pub fn env_var_for(dotted_key: &str) -> String {
    format!("HANDOVER_{}", dotted_key.replace('.', "_").to_ascii_uppercase())
}

fn is_secret(key: &str) -> bool {
    SECRET_KEYS.iter().any(|secret| key == *secret || key.ends_with(&format!(".{secret}")))
}

/// Describes the offending value, hiding credentials.
fn describe_actual(actual: &figment::error::Actual, secret: bool) -> String {
    if secret {
        "a value (hidden)".to_string()
    } else {
        actual.to_string()
    }
}

fn from_env(error: &figment::error::Error) -> bool {
    error
        .metadata
        .as_ref()
        .is_some_and(|m| m.name.contains("environment"))
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error may carry several underlying errors; each becomes one
/// `ConfigError`, with fuzzy match suggestions for unknown fields.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();

    for error in err {
        let config_error = match &error.kind {
            Kind::UnknownField(field, expected) if error.path.is_empty() => {
                let sections: Vec<&str> = expected.to_vec();
                let (span, src) = find_source_span(&error, field, toml_sources);
                ConfigError::UnknownSection {
                    section: field.clone(),
                    suggestion: suggest_key(field, &sections),
                    valid_sections: sections.join(", "),
                    span,
                    src,
                }
            }
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let (span, src) = find_source_span(&error, field, toml_sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, &valid_keys),
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut path = error.path.clone();
                path.push(field.to_string());
                ConfigError::MissingKey {
                    key: path.join("."),
                }
            }
            Kind::InvalidType(actual, expected) => {
                let key = error.path.join(".");
                ConfigError::InvalidType {
                    detail: format!(
                        "found {}, expected {expected}",
                        describe_actual(actual, is_secret(&key))
                    ),
                    expected: expected.to_string(),
                    env_var: from_env(&error).then(|| env_var_for(&key)),
                    key,
                }
            }
            _ => ConfigError::Other(format!("{error}")),
        };

        errors.push(config_error);
    }

    errors
}

/// Find source span for an error in the TOML source files.
fn find_source_span(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file source; fall back to the only source given.
    let source = match source_path {
        Some(path) => toml_sources
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(p, content)| (p.as_str(), content.as_str())),
        None if toml_sources.len() == 1 => toml_sources
            .first()
            .map(|(p, content)| (p.as_str(), content.as_str())),
        None => None,
    };

    let Some((path, content)) = source else {
        return (None, None);
    };
    let offset = if error.path.is_empty() {
        find_section_offset(content, field).or_else(|| find_key_offset(content, &[], field))
    } else {
        find_key_offset(content, &error.path, field)
    };
    match offset {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.to_string())),
        ),
        None => (None, None),
    }
}

/// Byte offset of the name inside a `[section]` header line.
pub fn find_section_offset(content: &str, section: &str) -> Option<usize> {
    let mut byte_offset = 0;
    for line in content.lines() {
        let trimmed = line.trim_start();
        let name = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
            .map(str::trim);
        if name == Some(section) {
            let indent = line.len() - trimmed.len();
            let name_start = trimmed[1..].find(section).map_or(1, |i| i + 1);
            return Some(byte_offset + indent + name_start);
        }
        byte_offset += line.len() + 1;
    }
    None
}

/// Find the byte offset of a key in TOML content, relative to a section path.
///
/// For `path = ["slack"]` and `field = "bot_tken"`, finds the `[slack]` header
/// then searches for `bot_tken` after it. For top-level fields, searches from start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header).map(|pos| pos + header.len())?
        }
    };

    let remaining = content.get(search_start..)?;

    let mut byte_offset = 0;
    for line in remaining.lines() {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field) {
            if after.starts_with(' ') || after.starts_with('=') || after.starts_with('\t') {
                let field_start_in_line = line.len() - trimmed.len();
                return Some(search_start + byte_offset + field_start_in_line);
            }
        }
        byte_offset += line.len() + 1;
    }

    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
///
/// Returns the best match above the similarity threshold, or `None` if
/// no valid key is close enough to the unknown key.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let mut best_score = SUGGESTION_THRESHOLD;
    let mut best_match = None;

    for &key in valid_keys {
        let score = strsim::jaro_winkler(unknown, key);
        if score > best_score {
            best_score = score;
            best_match = Some(key.to_string());
        }
    }

    best_match
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_bot_tken_for_bot_token() {
        let valid = &["bot_token", "support_channel", "broadcast_channel"];
        assert_eq!(suggest_key("bot_tken", valid), Some("bot_token".to_string()));
    }

    #[test]
    fn suggest_first_reminder() {
        let valid = &["enabled", "first_reminder_secs", "second_reminder_secs"];
        assert_eq!(
            suggest_key("frist_reminder_secs", valid),
            Some("first_reminder_secs".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[gateway]\nport = 1\n\n[slack]\nbot_tken = \"x\"\n";
        let path = vec!["slack".to_string()];
        let o = find_key_offset(content, &path, "bot_tken").unwrap();
        assert_eq!(&content[o..o + 8], "bot_tken");
    }

    #[test]
    fn find_section_offset_points_at_the_name() {
        let content = "[gateway]\nport = 1\n\n[slak]\nbot_token = \"x\"\n";
        let o = find_section_offset(content, "slak").unwrap();
        assert_eq!(&content[o..o + 4], "slak");
        assert_eq!(find_section_offset(content, "slack"), None);
    }

    #[test]
    fn env_var_names_follow_the_override_scheme() {
        assert_eq!(env_var_for("slack.bot_token"), "HANDOVER_SLACK_BOT_TOKEN");
        assert_eq!(env_var_for("gateway.port"), "HANDOVER_GATEWAY_PORT");
    }

    #[test]
    fn secret_values_are_hidden() {
        use figment::error::Actual;

        assert!(is_secret("slack.bot_token"));
        assert!(is_secret("ai.api_key"));
        assert!(!is_secret("slack.support_channel"));
        let hidden = describe_actual(&Actual::Str("xoxb-123".into()), true);
        assert!(!hidden.contains("xoxb"), "{hidden}");
        let shown = describe_actual(&Actual::Str("C0X".into()), false);
        assert!(shown.contains("C0X"), "{shown}");
    }

    #[test]
    fn find_key_offset_missing_section() {
        let content = "[gateway]\nport = 1\n";
        assert_eq!(find_key_offset(content, &["slack".to_string()], "port"), None);
    }
}
