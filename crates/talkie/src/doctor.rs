// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `talkie doctor` command implementation.
//!
//! Runs diagnostic checks against the Talkie environment to identify
//! configuration issues, an unreadable mailbox, or an unusable spool directory.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use talkie_config::model::StorageConfig;
use talkie_config::TalkieConfig;
use talkie_core::{HealthStatus, MailboxStore, PluginAdapter, TalkieError};
use talkie_storage::SqliteMailbox;
use tracing::debug;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `talkie doctor` command.
///
/// With `--plain`, disables colored output.
pub async fn run_doctor(config: &TalkieConfig, plain: bool) -> Result<(), TalkieError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = vec![
        check_config().await,
        check_database(&config.storage.database_path).await,
        check_mailbox_health(&config.storage).await,
        check_spool_dir(&config.storage.spool_dir).await,
    ];

    println!();
    println!("  talkie doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_result(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_result(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check configuration loads without errors.
async fn check_config() -> CheckResult {
    let start = Instant::now();
    match talkie_config::load_and_validate() {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check the mailbox database exists, opens, and has the messages table.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();

    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Mailbox",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("Mailbox", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };

    let counts = conn
        .call(|conn| -> Result<(i64, i64), rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(read = 0), 0) FROM messages WHERE folder = 'inbox'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .await;

    match counts {
        Ok((total, unread)) => CheckResult::new(
            "Mailbox",
            CheckStatus::Pass,
            format!("{total} message(s), {unread} unread"),
            start,
        ),
        Err(e) => CheckResult::new("Mailbox", CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

/// Mailbox health as reported by the storage adapter: SQLite integrity
/// and the presence of every message's audio file.
async fn check_mailbox_health(storage: &StorageConfig) -> CheckResult {
    let start = Instant::now();

    if !Path::new(&storage.database_path).exists() {
        return CheckResult::new(
            "Mailbox health",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let mailbox = match SqliteMailbox::open(storage).await {
        Ok(mailbox) => mailbox,
        Err(e) => {
            return CheckResult::new(
                "Mailbox health",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };

    let result = match mailbox.health_check().await {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Mailbox health", CheckStatus::Pass, "ok", start)
        }
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Mailbox health", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Mailbox health", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new(
            "Mailbox health",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    };
    if let Err(e) = mailbox.close().await {
        debug!(error = %e, "mailbox close after health check failed");
    }
    result
}

/// Check the spool directory exists and is writable.
async fn check_spool_dir(spool_dir: &str) -> CheckResult {
    let start = Instant::now();

    let metadata = match tokio::fs::metadata(spool_dir).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return CheckResult::new(
                "Spool directory",
                CheckStatus::Warn,
                format!("not found: {spool_dir} (will be created on first run)"),
                start,
            );
        }
        Err(e) => {
            return CheckResult::new(
                "Spool directory",
                CheckStatus::Fail,
                format!("cannot access: {e}"),
                start,
            );
        }
    };

    if !metadata.is_dir() {
        return CheckResult::new(
            "Spool directory",
            CheckStatus::Fail,
            format!("{spool_dir} is not a directory"),
            start,
        );
    }
    if metadata.permissions().readonly() {
        return CheckResult::new("Spool directory", CheckStatus::Fail, "read-only", start);
    }

    let files = match tokio::fs::read_dir(spool_dir).await {
        Ok(mut entries) => {
            let mut count = 0usize;
            while let Ok(Some(_)) = entries.next_entry().await {
                count += 1;
            }
            count
        }
        Err(e) => {
            return CheckResult::new(
                "Spool directory",
                CheckStatus::Fail,
                format!("cannot list: {e}"),
                start,
            );
        }
    };

    CheckResult::new(
        "Spool directory",
        CheckStatus::Pass,
        format!("{files} file(s)"),
        start,
    )
}
