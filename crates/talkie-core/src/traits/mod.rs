// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the voice-message service.
//!
//! Adapters wrapping an external system extend the [`PluginAdapter`] base
//! trait and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod audio;
pub mod mailbox;
pub mod network;
pub mod notification;
pub mod preferences;

pub use adapter::PluginAdapter;
pub use audio::{AudioDevice, PlaybackListener};
pub use mailbox::MailboxStore;
pub use network::{NetworkClient, NetworkSession, TransferFactory, TransferHandler};
pub use notification::NotificationSink;
pub use preferences::PreferenceSource;
