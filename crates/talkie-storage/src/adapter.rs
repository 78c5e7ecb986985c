// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the MailboxStore trait.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use talkie_config::model::StorageConfig;
use talkie_core::{
    AdapterType, Folder, HealthStatus, MailboxChange, MailboxStore, Message, MessageId,
    NewMessage, PluginAdapter, TalkieError,
};

use crate::database::Database;
use crate::queries;

/// Capacity of the change broadcast. Slow subscribers observe `Lagged`.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// SQLite-backed mailbox.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. Every successful mutation is broadcast as a
/// [`MailboxChange`].
pub struct SqliteMailbox {
    db: Database,
    changes: broadcast::Sender<MailboxChange>,
}

impl SqliteMailbox {
    /// Open the mailbox described by the storage configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, TalkieError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite mailbox initialized");
        Ok(Self::with_database(db))
    }

    /// Wrap an already opened database.
    pub fn with_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { db, changes }
    }

    fn publish(&self, change: MailboxChange) {
        // No receivers is fine.
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl PluginAdapter for SqliteMailbox {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mailbox
    }

    /// Unhealthy when SQLite reports corruption, degraded when stored
    /// messages point at payload files that no longer exist.
    async fn health_check(&self) -> Result<HealthStatus, TalkieError> {
        let problems = self.db.quick_check().await?;
        if !(problems.len() == 1 && problems[0] == "ok") {
            let first = problems.first().cloned().unwrap_or_default();
            return Ok(HealthStatus::Unhealthy(format!(
                "{} integrity problem(s): {first}",
                problems.len()
            )));
        }

        let mut missing = 0usize;
        for file in queries::messages::payload_files(&self.db).await? {
            if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
                missing += 1;
            }
        }
        if missing > 0 {
            return Ok(HealthStatus::Degraded(format!(
                "{missing} message(s) without audio file"
            )));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TalkieError> {
        self.close().await
    }
}

#[async_trait]
impl MailboxStore for SqliteMailbox {
    async fn insert(&self, folder: Folder, msg: &NewMessage) -> Result<MessageId, TalkieError> {
        let id = queries::messages::insert_message(&self.db, folder, msg).await?;
        debug!(%folder, %id, source = %msg.source, "message stored");
        self.publish(MailboxChange::Inserted { folder, id });
        Ok(id)
    }

    async fn get(&self, folder: Folder, id: MessageId) -> Result<Option<Message>, TalkieError> {
        queries::messages::get_message(&self.db, folder, id).await
    }

    async fn mark_read(
        &self,
        folder: Folder,
        id: MessageId,
        read: bool,
    ) -> Result<(), TalkieError> {
        let touched = queries::messages::set_read(&self.db, folder, id, read).await?;
        if touched == 0 {
            return Err(TalkieError::NotFound { folder, id });
        }
        self.publish(MailboxChange::Marked { folder, id, read });
        Ok(())
    }

    async fn next_unread(&self, folder: Folder) -> Result<Option<Message>, TalkieError> {
        queries::messages::next_unread(&self.db, folder).await
    }

    async fn unread_count(&self, folder: Folder) -> Result<u64, TalkieError> {
        queries::messages::unread_count(&self.db, folder).await
    }

    async fn list(&self, folder: Folder) -> Result<Vec<Message>, TalkieError> {
        queries::messages::list_messages(&self.db, folder).await
    }

    async fn remove(&self, folder: Folder, id: MessageId) -> Result<Option<Message>, TalkieError> {
        let removed = queries::messages::delete_message(&self.db, folder, id).await?;
        if let Some(message) = &removed {
            match tokio::fs::remove_file(&message.file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    file = %message.file.display(),
                    error = %e,
                    "failed to delete payload of removed message"
                ),
            }
            self.publish(MailboxChange::Removed { folder, id });
        }
        Ok(removed)
    }

    fn subscribe(&self) -> broadcast::Receiver<MailboxChange> {
        self.changes.subscribe()
    }

    async fn close(&self) -> Result<(), TalkieError> {
        self.db.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn make_config(dir: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: dir.join("mailbox.db").to_string_lossy().into_owned(),
            wal_mode: true,
            spool_dir: dir.join("spool").to_string_lossy().into_owned(),
        }
    }

    fn new_message(file: PathBuf) -> NewMessage {
        let now = Utc::now();
        NewMessage {
            source: "dtn://node1/dtalkie".parse().unwrap(),
            destination: "dtn://node2/dtalkie".parse().unwrap(),
            created: now,
            received: now,
            file,
        }
    }

    #[tokio::test]
    async fn sqlite_mailbox_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();

        assert_eq!(mailbox.name(), "sqlite");
        assert_eq!(mailbox.version(), semver::Version::new(0, 1, 0));
        assert_eq!(mailbox.adapter_type(), AdapterType::Mailbox);
        assert_eq!(mailbox.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn missing_payload_degrades_health() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();
        let present = dir.path().join("present.3gp");
        std::fs::write(&present, b"AMR").unwrap();
        mailbox.insert(Folder::Inbox, &new_message(present)).await.unwrap();
        assert_eq!(mailbox.health_check().await.unwrap(), HealthStatus::Healthy);

        mailbox
            .insert(Folder::Outbox, &new_message(dir.path().join("gone.3gp")))
            .await
            .unwrap();
        assert_eq!(
            mailbox.health_check().await.unwrap(),
            HealthStatus::Degraded("1 message(s) without audio file".to_string())
        );
    }

    #[tokio::test]
    async fn mutations_are_broadcast() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();
        let mut changes = mailbox.subscribe();

        let id = mailbox
            .insert(Folder::Inbox, &new_message(dir.path().join("a.3gp")))
            .await
            .unwrap();
        mailbox.mark_read(Folder::Inbox, id, true).await.unwrap();
        mailbox.remove(Folder::Inbox, id).await.unwrap();

        assert_eq!(
            changes.recv().await.unwrap(),
            MailboxChange::Inserted { folder: Folder::Inbox, id }
        );
        assert_eq!(
            changes.recv().await.unwrap(),
            MailboxChange::Marked { folder: Folder::Inbox, id, read: true }
        );
        assert_eq!(
            changes.recv().await.unwrap(),
            MailboxChange::Removed { folder: Folder::Inbox, id }
        );
    }

    #[tokio::test]
    async fn mark_read_on_missing_message_is_not_found() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();
        let err = mailbox
            .mark_read(Folder::Inbox, MessageId(99), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TalkieError::NotFound { folder: Folder::Inbox, id: MessageId(99) }
        ));
    }

    #[tokio::test]
    async fn remove_deletes_payload_file() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();
        let file = dir.path().join("voice.3gp");
        std::fs::write(&file, b"AMR").unwrap();

        let id = mailbox.insert(Folder::Inbox, &new_message(file.clone())).await.unwrap();
        let removed = mailbox.remove(Folder::Inbox, id).await.unwrap();

        assert_eq!(removed.map(|m| m.id), Some(id));
        assert!(!file.exists());
        assert_eq!(mailbox.unread_count(Folder::Inbox).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_tolerates_missing_payload() {
        let dir = tempdir().unwrap();
        let mailbox = SqliteMailbox::open(&make_config(dir.path())).await.unwrap();
        let id = mailbox
            .insert(Folder::Inbox, &new_message(dir.path().join("never-written.3gp")))
            .await
            .unwrap();
        assert!(mailbox.remove(Folder::Inbox, id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn messages_survive_reopen() {
        let dir = tempdir().unwrap();
        let config = make_config(dir.path());
        let id = {
            let mailbox = SqliteMailbox::open(&config).await.unwrap();
            let id = mailbox
                .insert(Folder::Inbox, &new_message(dir.path().join("p.3gp")))
                .await
                .unwrap();
            mailbox.close().await.unwrap();
            id
        };

        let mailbox = SqliteMailbox::open(&config).await.unwrap();
        let stored = mailbox.get(Folder::Inbox, id).await.unwrap().unwrap();
        assert!(!stored.read);
    }
}
