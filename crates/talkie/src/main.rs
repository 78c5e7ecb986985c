// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Talkie - DTN voice-message mailbox tool.
//!
//! Inspects and maintains the mailbox the Talkie service writes to, and
//! diagnoses the local environment.

mod doctor;
mod inbox;

use clap::{Parser, Subcommand};
use talkie_config::TalkieConfig;
use talkie_core::{Folder, MailboxStore, MessageId, TalkieError};
use talkie_storage::SqliteMailbox;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Talkie - DTN voice-message mailbox tool.
#[derive(Parser, Debug)]
#[command(name = "talkie", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// List the messages of a mailbox folder.
    Inbox {
        /// Folder to list.
        #[arg(long, default_value = "inbox")]
        folder: Folder,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Mark a message as read (or unread).
    Mark {
        id: i64,
        #[arg(long, default_value = "inbox")]
        folder: Folder,
        /// Mark the message unread instead.
        #[arg(long)]
        unread: bool,
    },
    /// Delete a message and its audio file.
    Remove {
        id: i64,
        #[arg(long, default_value = "inbox")]
        folder: Folder,
    },
    /// Run diagnostic checks against the local environment.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn init_tracing(config: &TalkieConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("talkie={},warn", config.service.log_level))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match talkie_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            talkie_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    if let Err(e) = run(cli, &config).await {
        eprintln!("talkie: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &TalkieConfig) -> Result<(), TalkieError> {
    let Some(command) = cli.command else {
        println!("talkie: use --help for available commands");
        return Ok(());
    };
    debug!(?command, "running command");

    match command {
        Commands::Doctor { plain } => doctor::run_doctor(config, plain).await,
        Commands::Inbox {
            folder,
            json,
            plain,
        } => {
            let mailbox = inbox::open_mailbox(config).await?;
            let result = inbox::run_inbox(&mailbox, folder, json, plain).await;
            close_after(mailbox, result).await
        }
        Commands::Mark { id, folder, unread } => {
            let mailbox = inbox::open_mailbox(config).await?;
            let result = inbox::run_mark(&mailbox, folder, MessageId(id), !unread).await;
            close_after(mailbox, result).await
        }
        Commands::Remove { id, folder } => {
            let mailbox = inbox::open_mailbox(config).await?;
            let result = inbox::run_remove(&mailbox, folder, MessageId(id)).await;
            close_after(mailbox, result).await
        }
    }
}

/// Checkpoint the mailbox whatever the command's outcome; the command's
/// own error wins over a close error.
async fn close_after(
    mailbox: SqliteMailbox,
    result: Result<(), TalkieError>,
) -> Result<(), TalkieError> {
    let closed = mailbox.close().await;
    if let Err(e) = &closed {
        warn!(error = %e, "mailbox checkpoint failed");
    }
    result.and(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mark_parses_folder_and_unread_flag() {
        let cli = Cli::try_parse_from(["talkie", "mark", "7", "--folder", "outbox", "--unread"])
            .unwrap();
        match cli.command {
            Some(Commands::Mark { id, folder, unread }) => {
                assert_eq!(id, 7);
                assert_eq!(folder, Folder::Outbox);
                assert!(unread);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_folder_is_rejected() {
        assert!(Cli::try_parse_from(["talkie", "inbox", "--folder", "trash"]).is_err());
    }

    fn temp_config(dir: &tempfile::TempDir) -> TalkieConfig {
        let mut config = TalkieConfig::default();
        config.storage.database_path = dir.path().join("talkie.db").to_string_lossy().into_owned();
        config.storage.spool_dir = dir.path().join("spool").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn failing_command_reports_its_own_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let cli = Cli::try_parse_from(["talkie", "remove", "5"]).unwrap();
        let err = run(cli, &config).await.unwrap_err();
        assert!(matches!(err, TalkieError::NotFound { id: MessageId(5), .. }));

        let wal = dir.path().join("talkie.db-wal");
        assert!(!wal.exists() || std::fs::metadata(&wal).unwrap().len() == 0);
    }

    #[tokio::test]
    async fn mailbox_commands_create_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let cli = Cli::try_parse_from(["talkie", "inbox", "--json"]).unwrap();
        run(cli, &config).await.unwrap();
        assert!(dir.path().join("talkie.db").exists());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = TalkieConfig::default();
        assert_eq!(config.network.endpoint, "dtalkie");
    }
}
