// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Talkie voice-message service.

use thiserror::Error;

use crate::types::{Folder, MessageId};

/// The primary error type used across all Talkie traits and core operations.
#[derive(Debug, Error)]
pub enum TalkieError {
    /// Mailbox storage errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Errors reported by the DTN network session (send, query, delivered).
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The DTN daemon could not be reached during initialization.
    #[error("DTN service is not available")]
    ServiceUnavailable,

    /// The DTN daemon refused the registration.
    #[error("permission to use the DTN service was not granted")]
    PermissionDenied,

    /// An inbound transfer could not be materialized (file creation, sink errors).
    #[error("transfer error: {message}")]
    Transfer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The audio device failed to prepare or render a file.
    #[error("playback error: {message}")]
    Playback { message: String },

    /// A playback session is already active.
    #[error("a playback session is already active")]
    PlaybackBusy,

    /// No message with the given id exists in the folder.
    #[error("message {id} not found in {folder}")]
    NotFound { folder: Folder, id: MessageId },

    /// A string could not be parsed as a DTN endpoint identifier.
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),

    /// Local filesystem errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TalkieError {
    /// Shorthand for a network error without an underlying cause.
    pub fn network(message: impl Into<String>) -> Self {
        TalkieError::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a playback error.
    pub fn playback(message: impl Into<String>) -> Self {
        TalkieError::Playback {
            message: message.into(),
        }
    }
}
