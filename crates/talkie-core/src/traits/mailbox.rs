// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox store trait for persisted voice messages.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::TalkieError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Folder, MailboxChange, Message, MessageId, NewMessage};

/// Durable per-folder collection of voice messages.
///
/// Every successful mutation is announced on the channel returned by
/// [`MailboxStore::subscribe`].
#[async_trait]
pub trait MailboxStore: PluginAdapter {
    /// Inserts an unread message and returns its new identifier.
    async fn insert(&self, folder: Folder, msg: &NewMessage) -> Result<MessageId, TalkieError>;

    /// Reads one message.
    async fn get(&self, folder: Folder, id: MessageId) -> Result<Option<Message>, TalkieError>;

    /// Sets the read flag of a message. Missing messages are reported as `NotFound`.
    async fn mark_read(&self, folder: Folder, id: MessageId, read: bool)
        -> Result<(), TalkieError>;

    /// Oldest unread message of the folder by local receipt time, ties broken by id.
    async fn next_unread(&self, folder: Folder) -> Result<Option<Message>, TalkieError>;

    /// Number of unread messages in the folder.
    async fn unread_count(&self, folder: Folder) -> Result<u64, TalkieError>;

    /// All messages of the folder, most recently received first.
    async fn list(&self, folder: Folder) -> Result<Vec<Message>, TalkieError>;

    /// Removes a message and returns it, or `None` if it did not exist.
    async fn remove(&self, folder: Folder, id: MessageId) -> Result<Option<Message>, TalkieError>;

    /// Subscribes to mutation events.
    fn subscribe(&self) -> broadcast::Receiver<MailboxChange>;

    /// Flushes pending writes and closes the store.
    async fn close(&self) -> Result<(), TalkieError>;
}
