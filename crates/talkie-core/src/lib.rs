// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Talkie voice-message service.
//!
//! This crate provides the error type, the domain types (messages, bundle
//! metadata, endpoints), and the traits for every collaborator the service
//! talks to: the DTN network session, the mailbox store, the audio device,
//! the notification sink, and the preference source.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TalkieError;
pub use types::{
    AdapterType, AudioRoute, BlockDescriptor, BundleId, BundleMeta, Cue, Endpoint, Folder,
    HealthStatus, MailboxChange, Message, MessageId, NewMessage, PreferenceChange, Registration,
    ServiceStatus, TransferMode, UnreadNotification,
};

pub use traits::{
    AudioDevice, MailboxStore, NetworkClient, NetworkSession, NotificationSink, PlaybackListener,
    PluginAdapter, PreferenceSource, TransferFactory, TransferHandler,
};
