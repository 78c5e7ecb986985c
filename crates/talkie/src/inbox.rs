// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `talkie inbox`, `talkie mark` and `talkie remove` command implementations.

use std::io::IsTerminal;

use serde::Serialize;
use talkie_config::TalkieConfig;
use talkie_core::{Folder, MailboxStore, Message, MessageId, TalkieError};
use talkie_storage::SqliteMailbox;

/// Structured listing for `--json` mode.
#[derive(Debug, Serialize)]
pub struct InboxResponse {
    pub folder: Folder,
    pub unread: u64,
    pub messages: Vec<Message>,
}

pub async fn open_mailbox(config: &TalkieConfig) -> Result<SqliteMailbox, TalkieError> {
    SqliteMailbox::open(&config.storage).await
}

/// Run the `talkie inbox` command.
///
/// Lists newest messages first. If `--json` is passed, outputs structured
/// JSON for scripting. If `--plain` is passed or stdout is not a TTY,
/// disables colors.
pub async fn run_inbox(
    mailbox: &dyn MailboxStore,
    folder: Folder,
    json: bool,
    plain: bool,
) -> Result<(), TalkieError> {
    let messages = mailbox.list(folder).await?;
    let unread = mailbox.unread_count(folder).await?;

    if json {
        let response = InboxResponse {
            folder,
            unread,
            messages,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  talkie {folder} ({} messages, {unread} unread)", messages.len());
    println!("  {}", "-".repeat(60));
    for message in &messages {
        println!("{}", format_row(message, use_color));
    }
    if messages.is_empty() {
        println!("    (empty)");
    }
    println!();
    Ok(())
}

/// Run the `talkie mark` command.
pub async fn run_mark(
    mailbox: &dyn MailboxStore,
    folder: Folder,
    id: MessageId,
    read: bool,
) -> Result<(), TalkieError> {
    mailbox.mark_read(folder, id, read).await?;
    let state = if read { "read" } else { "unread" };
    println!("message {id} marked {state}");
    Ok(())
}

/// Run the `talkie remove` command.
pub async fn run_remove(
    mailbox: &dyn MailboxStore,
    folder: Folder,
    id: MessageId,
) -> Result<(), TalkieError> {
    match mailbox.remove(folder, id).await? {
        Some(message) => {
            println!("removed message {id} ({})", message.file.display());
            Ok(())
        }
        None => Err(TalkieError::NotFound { folder, id }),
    }
}

/// One listing line: unread marker, id, received time, source.
fn format_row(message: &Message, use_color: bool) -> String {
    let received = message.received.format("%Y-%m-%d %H:%M:%S");
    let id = format!("#{}", message.id);
    if use_color {
        use colored::Colorize;
        if message.read {
            format!("      {id:<6} {received}  {}", message.source.as_str().dimmed())
        } else {
            format!(
                "    {} {:<6} {received}  {}",
                "●".green(),
                id.bold(),
                message.source.as_str().bold()
            )
        }
    } else {
        let marker = if message.read { " " } else { "*" };
        format!("    {marker} {id:<6} {received}  {}", message.source)
    }
}
