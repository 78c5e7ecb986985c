// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailbox message CRUD operations.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use talkie_core::TalkieError;

use crate::database::{map_tr_err, Database};
use crate::models::{Folder, Message, MessageId, NewMessage};

const COLUMNS: &str = "id, folder, source, destination, created, received, file, read";

/// Fixed-width UTC rendering at full precision; text order equals time order.
///
/// RFC 3339 only has four-digit years, so times outside 0001..=9999 are
/// refused rather than written in a form that cannot be read back.
fn time_to_sql(field: &str, time: &DateTime<Utc>) -> Result<String, TalkieError> {
    if !(1..=9999).contains(&time.year()) {
        return Err(TalkieError::Storage {
            source: format!("{field} time {time} is outside the storable range").into(),
        });
    }
    Ok(time.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let folder: String = row.get(1)?;
    let source: String = row.get(2)?;
    let destination: String = row.get(3)?;
    let created: String = row.get(4)?;
    let received: String = row.get(5)?;
    let file: String = row.get(6)?;

    Ok(Message {
        id: MessageId(row.get(0)?),
        folder: parse_column(1, &folder)?,
        source: parse_column(2, &source)?,
        destination: parse_column(3, &destination)?,
        created: parse_time(4, &created)?,
        received: parse_time(5, &received)?,
        file: PathBuf::from(file),
        read: row.get(7)?,
    })
}

/// Insert an unread message and return its assigned id.
pub async fn insert_message(
    db: &Database,
    folder: Folder,
    msg: &NewMessage,
) -> Result<MessageId, TalkieError> {
    let file = msg.file.to_string_lossy().into_owned();
    if file.is_empty() {
        return Err(TalkieError::Storage {
            source: "message payload file path must not be empty".into(),
        });
    }
    let source = msg.source.to_string();
    let destination = msg.destination.to_string();
    let created = time_to_sql("created", &msg.created)?;
    let received = time_to_sql("received", &msg.received)?;

    db.connection()
        .call(move |conn| -> Result<MessageId, rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (folder, source, destination, created, received, file, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![folder.as_str(), source, destination, created, received, file],
            )?;
            Ok(MessageId(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by id within a folder.
pub async fn get_message(
    db: &Database,
    folder: Folder,
    id: MessageId,
) -> Result<Option<Message>, TalkieError> {
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM messages WHERE folder = ?1 AND id = ?2"),
                params![folder.as_str(), id.0],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Set the read flag. Returns the number of rows touched (0 or 1).
pub async fn set_read(
    db: &Database,
    folder: Folder,
    id: MessageId,
    read: bool,
) -> Result<usize, TalkieError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE messages SET read = ?1 WHERE folder = ?2 AND id = ?3",
                params![read, folder.as_str(), id.0],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Oldest unread message by receipt time, ties broken by id.
pub async fn next_unread(db: &Database, folder: Folder) -> Result<Option<Message>, TalkieError> {
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM messages WHERE folder = ?1 AND read = 0
                     ORDER BY received ASC, id ASC LIMIT 1"
                ),
                params![folder.as_str()],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of unread messages in a folder.
pub async fn unread_count(db: &Database, folder: Folder) -> Result<u64, TalkieError> {
    let count = db
        .connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE folder = ?1 AND read = 0",
                params![folder.as_str()],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// All messages of a folder, most recently received first.
pub async fn list_messages(db: &Database, folder: Folder) -> Result<Vec<Message>, TalkieError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE folder = ?1
                 ORDER BY received DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![folder.as_str()], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Payload file paths of every stored message, across folders.
pub async fn payload_files(db: &Database) -> Result<Vec<PathBuf>, TalkieError> {
    db.connection()
        .call(|conn| -> Result<Vec<PathBuf>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT file FROM messages ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0).map(PathBuf::from))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a message and return the deleted row.
pub async fn delete_message(
    db: &Database,
    folder: Folder,
    id: MessageId,
) -> Result<Option<Message>, TalkieError> {
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    &format!("SELECT {COLUMNS} FROM messages WHERE folder = ?1 AND id = ?2"),
                    params![folder.as_str(), id.0],
                    row_to_message,
                )
                .optional()?;
            if existing.is_some() {
                tx.execute(
                    "DELETE FROM messages WHERE folder = ?1 AND id = ?2",
                    params![folder.as_str(), id.0],
                )?;
            }
            tx.commit()?;
            Ok(existing)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn new_message(received_offset_secs: i64, file: &str) -> NewMessage {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        NewMessage {
            source: "dtn://node1/dtalkie".parse().unwrap(),
            destination: "dtn://node2/dtalkie".parse().unwrap(),
            created: base,
            received: base + Duration::seconds(received_offset_secs),
            file: PathBuf::from(file),
        }
    }

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(dir.path().join("q.db"), true).await.unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let msg = new_message(0, "/spool/msg1.3gp");

        let id = insert_message(&db, Folder::Inbox, &msg).await.unwrap();
        let stored = get_message(&db, Folder::Inbox, id).await.unwrap().unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.folder, Folder::Inbox);
        assert_eq!(stored.source, msg.source);
        assert_eq!(stored.destination, msg.destination);
        assert_eq!(stored.created, msg.created);
        assert_eq!(stored.received, msg.received);
        assert_eq!(stored.file, msg.file);
        assert!(!stored.read);
    }

    #[tokio::test]
    async fn sub_microsecond_times_round_trip() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let mut msg = new_message(0, "/spool/msg2.3gp");
        msg.received = DateTime::parse_from_rfc3339("2023-11-14T22:13:20.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        msg.created = msg.received - Duration::nanoseconds(1);

        let id = insert_message(&db, Folder::Inbox, &msg).await.unwrap();
        let stored = get_message(&db, Folder::Inbox, id).await.unwrap().unwrap();
        assert_eq!(stored.received, msg.received);
        assert_eq!(stored.created, msg.created);
    }

    #[tokio::test]
    async fn receipt_order_resolves_nanoseconds() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let mut later = new_message(0, "/later.3gp");
        later.received = base + Duration::nanoseconds(900);
        let mut earlier = new_message(0, "/earlier.3gp");
        earlier.received = base + Duration::nanoseconds(100);

        insert_message(&db, Folder::Inbox, &later).await.unwrap();
        let first = insert_message(&db, Folder::Inbox, &earlier).await.unwrap();
        let next = next_unread(&db, Folder::Inbox).await.unwrap().unwrap();
        assert_eq!(next.id, first);
    }

    #[tokio::test]
    async fn unstorable_times_are_refused_and_leave_folder_readable() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let good = insert_message(&db, Folder::Inbox, &new_message(0, "/ok.3gp"))
            .await
            .unwrap();

        let mut far = new_message(0, "/far.3gp");
        far.created = DateTime::<Utc>::MAX_UTC;
        let err = insert_message(&db, Folder::Inbox, &far).await.unwrap_err();
        assert!(err.to_string().contains("created"));

        let mut ancient = new_message(0, "/ancient.3gp");
        ancient.received = DateTime::<Utc>::MIN_UTC;
        assert!(insert_message(&db, Folder::Inbox, &ancient).await.is_err());

        let listed = list_messages(&db, Folder::Inbox).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(next_unread(&db, Folder::Inbox).await.unwrap().unwrap().id, good);
    }

    #[tokio::test]
    async fn latest_dtn_creation_time_is_storable() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let mut msg = new_message(0, "/late.3gp");
        msg.created = talkie_core::types::dtn_time_to_utc(u64::MAX);

        let id = insert_message(&db, Folder::Inbox, &msg).await.unwrap();
        let stored = get_message(&db, Folder::Inbox, id).await.unwrap().unwrap();
        assert_eq!(stored.created, msg.created);
        assert_eq!(list_messages(&db, Folder::Inbox).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn payload_files_span_both_folders() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        insert_message(&db, Folder::Inbox, &new_message(0, "/in.3gp")).await.unwrap();
        insert_message(&db, Folder::Outbox, &new_message(1, "/out.3gp")).await.unwrap();

        let files = payload_files(&db).await.unwrap();
        assert_eq!(files, vec![PathBuf::from("/in.3gp"), PathBuf::from("/out.3gp")]);
    }

    #[tokio::test]
    async fn get_does_not_cross_folders() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let id = insert_message(&db, Folder::Inbox, &new_message(0, "/a.3gp"))
            .await
            .unwrap();
        assert!(get_message(&db, Folder::Outbox, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_file_path_is_rejected() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let err = insert_message(&db, Folder::Inbox, &new_message(0, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TalkieError::Storage { .. }));
    }

    #[tokio::test]
    async fn next_unread_orders_by_receipt_then_id() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let late = insert_message(&db, Folder::Inbox, &new_message(60, "/late.3gp"))
            .await
            .unwrap();
        let early_a = insert_message(&db, Folder::Inbox, &new_message(0, "/a.3gp"))
            .await
            .unwrap();
        let early_b = insert_message(&db, Folder::Inbox, &new_message(0, "/b.3gp"))
            .await
            .unwrap();

        assert_eq!(next_unread(&db, Folder::Inbox).await.unwrap().unwrap().id, early_a);
        set_read(&db, Folder::Inbox, early_a, true).await.unwrap();
        assert_eq!(next_unread(&db, Folder::Inbox).await.unwrap().unwrap().id, early_b);
        set_read(&db, Folder::Inbox, early_b, true).await.unwrap();
        assert_eq!(next_unread(&db, Folder::Inbox).await.unwrap().unwrap().id, late);
        set_read(&db, Folder::Inbox, late, true).await.unwrap();
        assert!(next_unread(&db, Folder::Inbox).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unread_count_and_list_ordering() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let first = insert_message(&db, Folder::Inbox, &new_message(0, "/1.3gp"))
            .await
            .unwrap();
        let second = insert_message(&db, Folder::Inbox, &new_message(10, "/2.3gp"))
            .await
            .unwrap();
        insert_message(&db, Folder::Outbox, &new_message(5, "/out.3gp"))
            .await
            .unwrap();

        assert_eq!(unread_count(&db, Folder::Inbox).await.unwrap(), 2);
        assert_eq!(unread_count(&db, Folder::Outbox).await.unwrap(), 1);

        let listed: Vec<MessageId> = list_messages(&db, Folder::Inbox)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn set_read_reports_missing_rows() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        assert_eq!(set_read(&db, Folder::Inbox, MessageId(42), true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_returns_the_removed_row() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let id = insert_message(&db, Folder::Inbox, &new_message(0, "/gone.3gp"))
            .await
            .unwrap();

        let removed = delete_message(&db, Folder::Inbox, id).await.unwrap().unwrap();
        assert_eq!(removed.id, id);
        assert!(get_message(&db, Folder::Inbox, id).await.unwrap().is_none());
        assert!(delete_message(&db, Folder::Inbox, id).await.unwrap().is_none());
    }
}
