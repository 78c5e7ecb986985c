// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered with miette.
//!
//! Figment reports problems with a key path and little else. This module
//! knows the layout of `talkie.toml` (five sections, a fixed set of keys
//! per section) and turns those reports into diagnostics that point at the
//! offending line, name the section, and say what a valid value looks like.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score above which an unknown name is treated as a typo.
const TYPO_THRESHOLD: f64 = 0.75;

/// Sections of `talkie.toml` and the keys each one accepts.
pub const SECTIONS: [(&str, &[&str]); 5] = [
    ("service", &["log_level"]),
    ("network", &["endpoint", "group_endpoint"]),
    ("storage", &["database_path", "wal_mode", "spool_dir"]),
    ("playback", &["completion_timeout_secs"]),
    ("preferences", &["autoplay", "vibrate_on_message", "ringtone_uri"]),
];

/// A problem with the Talkie configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A table header that is not one of the five sections.
    #[error("unknown section `[{section}]`")]
    #[diagnostic(code(talkie::config::unknown_section))]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        #[help]
        help: String,
        #[label("not a talkie.toml section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key that its section does not accept.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(code(talkie::config::unknown_key))]
    UnknownKey {
        section: String,
        key: String,
        /// Closest key of the same section, if the name looks like a typo.
        suggestion: Option<String>,
        #[help]
        help: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(talkie::config::invalid_type))]
    InvalidType {
        /// Dotted path, e.g. `playback.completion_timeout_secs`.
        key: String,
        found: String,
        #[help]
        help: String,
    },

    /// A well-typed value that is not acceptable.
    #[error("invalid `{key}`: {message}")]
    #[diagnostic(code(talkie::config::validation))]
    Validation {
        key: &'static str,
        message: String,
        #[help]
        help: Option<&'static str>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(talkie::config::other))]
    Other(String),
}

impl ConfigError {
    /// A validation failure for `key`, with the key's usage hint attached.
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key,
            message: message.into(),
            help: key_hint(key),
        }
    }
}

/// What a valid value of `key` (dotted path) looks like.
pub fn key_hint(key: &str) -> Option<&'static str> {
    let hint = match key {
        "service.log_level" => "one of trace, debug, info, warn, error",
        "network.endpoint" => {
            "a bare application name such as `dtalkie`; the DTN daemon adds the node prefix"
        }
        "network.group_endpoint" => {
            "a `dtn://host/path` or `ipn:node.service` endpoint, or \"\" to skip the group subscription"
        }
        "storage.database_path" => "a path to the SQLite mailbox file; parent directories are created",
        "storage.wal_mode" => "true or false",
        "storage.spool_dir" => "a directory for received recordings; created on first run",
        "playback.completion_timeout_secs" => {
            "a whole number of seconds, at least 1; a playback running longer is abandoned"
        }
        "preferences.autoplay" | "preferences.vibrate_on_message" => "true or false",
        "preferences.ringtone_uri" => "a non-empty ringtone URI",
        _ => return None,
    };
    Some(hint)
}

/// Keys accepted by `section`, or `None` for an unknown section.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// The section that owns `key`, if any.
pub fn owning_section(key: &str) -> Option<&'static str> {
    SECTIONS
        .iter()
        .find(|(_, keys)| keys.contains(&key))
        .map(|(name, _)| *name)
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if it is
/// close enough to be a typo.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|&c| (strsim::jaro_winkler(unknown, c), c))
        .filter(|(score, _)| *score > TYPO_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

fn unknown_section(section: &str, located: Located) -> ConfigError {
    let names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();
    let suggestion = suggest_key(section, &names);
    let listing = names
        .iter()
        .map(|n| format!("[{n}]"))
        .collect::<Vec<_>>()
        .join(", ");
    let help = match (owning_section(section), &suggestion) {
        (Some(owner), _) => format!("`{section}` is a key, write it under [{owner}]"),
        (None, Some(s)) => format!("did you mean `[{s}]`? talkie.toml has {listing}"),
        (None, None) => format!("talkie.toml has {listing}"),
    };
    ConfigError::UnknownSection {
        section: section.to_string(),
        suggestion,
        help,
        span: located.span,
        src: located.src,
    }
}

fn unknown_key(section: &str, key: &str, located: Located) -> ConfigError {
    let keys = section_keys(section).unwrap_or(&[]);
    let owner = owning_section(key);
    let suggestion = match owner {
        Some(_) => None,
        None => suggest_key(key, keys),
    };
    let help = match (owner, &suggestion) {
        (Some(owner), _) => format!("`{key}` belongs in [{owner}], not [{section}]"),
        (None, Some(s)) => format!("did you mean `{s}`? [{section}] accepts {}", keys.join(", ")),
        (None, None) => format!("[{section}] accepts {}", keys.join(", ")),
    };
    ConfigError::UnknownKey {
        section: section.to_string(),
        key: key.to_string(),
        suggestion,
        help,
        span: located.span,
        src: located.src,
    }
}

/// Convert a `figment::Error` (which may hold several problems) into diagnostics.
///
/// `toml_sources` are `(path, content)` pairs used to point at the offending line.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section = error.path.first().cloned();
            match (&error.kind, section) {
                (Kind::UnknownField(name, _), None) => {
                    unknown_section(name, locate(&error, toml_sources, None, name))
                }
                (Kind::UnknownField(name, _), Some(section)) => unknown_key(
                    &section,
                    name,
                    locate(&error, toml_sources, Some(&section), name),
                ),
                (Kind::InvalidType(actual, expected), _) => {
                    let key = error.path.join(".");
                    let help = key_hint(&key)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("expected {expected}"));
                    ConfigError::InvalidType {
                        key,
                        found: actual.to_string(),
                        help,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

#[derive(Default)]
struct Located {
    span: Option<SourceSpan>,
    src: Option<NamedSource<String>>,
}

/// Point at `name` in the file figment read it from.
///
/// With `section == None`, `name` is looked up as a `[name]` header.
fn locate(
    error: &figment::error::Error,
    toml_sources: &[(String, String)],
    section: Option<&str>,
    name: &str,
) -> Located {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    // Inline strings carry no file metadata; a single source is unambiguous.
    let found = origin
        .and_then(|path| toml_sources.iter().find(|(p, _)| *p == path))
        .or_else(|| match toml_sources {
            [only] => Some(only),
            _ => None,
        });
    let Some((path, content)) = found else {
        return Located::default();
    };

    let offset = match section {
        None => find_section_offset(content, name).map(|o| (o + 1, name.len())),
        Some(section) => find_key_offset(content, section, name).map(|o| (o, name.len())),
    };
    match offset {
        Some((at, len)) => Located {
            span: Some(SourceSpan::new(at.into(), len)),
            src: Some(NamedSource::new(path, content.clone())),
        },
        None => Located::default(),
    }
}

/// Header name of a `[section]` line, ignoring surrounding whitespace.
fn header_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// Byte offset of the `[` that opens the `[section]` header.
pub fn find_section_offset(content: &str, section: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if header_name(line) == Some(section) {
            return Some(offset + (line.len() - line.trim_start().len()));
        }
        offset += line.len();
    }
    None
}

/// Byte offset of `key` inside the body of `[section]`.
///
/// Only lines between the section header and the next header are searched.
pub fn find_key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut offset = 0;
    let mut inside = false;
    for line in content.split_inclusive('\n') {
        if let Some(name) = header_name(line) {
            inside = name == section;
        } else if inside
            && let Some((lhs, _)) = line.split_once('=')
            && lhs.trim() == key
        {
            return Some(offset + (line.len() - line.trim_start().len()));
        }
        offset += line.len();
    }
    None
}

/// Print every error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
