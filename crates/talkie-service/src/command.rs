// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands processed by the dispatch worker and the sender used to enqueue them.

use std::path::PathBuf;

use talkie_core::{BundleId, Endpoint, Folder, MessageId, NewMessage};
use tokio::sync::mpsc;
use tracing::debug;

/// A unit of work for the single command worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Bundles are pending at the daemon; drain them.
    Receive,
    /// A transfer finished with a payload file.
    ReceivedInbound(NewMessage),
    /// Play one message.
    Play { folder: Folder, id: MessageId },
    /// Play the oldest unread message if autoplay is on.
    PlayNext { folder: Folder },
    /// Send a local recording.
    RecordedOutbound { file: PathBuf, destination: Endpoint },
    /// Acknowledge a consumed bundle.
    MarkDelivered(BundleId),
    /// The autoplay preference changed.
    AutoplayChanged(bool),
}

impl Command {
    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Receive => "receive",
            Command::ReceivedInbound(_) => "received_inbound",
            Command::Play { .. } => "play",
            Command::PlayNext { .. } => "play_next",
            Command::RecordedOutbound { .. } => "recorded_outbound",
            Command::MarkDelivered(_) => "mark_delivered",
            Command::AutoplayChanged(_) => "autoplay_changed",
        }
    }
}

/// Cloneable handle for enqueueing commands. Never blocks.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    /// Enqueue a command. Returns `false` once the worker has stopped.
    pub fn send(&self, command: Command) -> bool {
        let name = command.name();
        match self.tx.send(command) {
            Ok(()) => true,
            Err(_) => {
                debug!(command = name, "command queue closed, dropping command");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create the unbounded FIFO command queue.
pub fn command_channel() -> (CommandSender, mpsc::UnboundedReceiver<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_delivered_in_order() {
        let (sender, mut rx) = command_channel();
        assert!(sender.send(Command::Receive));
        assert!(sender.send(Command::PlayNext { folder: Folder::Inbox }));
        assert!(sender.send(Command::AutoplayChanged(true)));

        assert_eq!(rx.try_recv().unwrap(), Command::Receive);
        assert_eq!(rx.try_recv().unwrap(), Command::PlayNext { folder: Folder::Inbox });
        assert_eq!(rx.try_recv().unwrap(), Command::AutoplayChanged(true));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_after_worker_exit_reports_false() {
        let (sender, rx) = command_channel();
        drop(rx);
        assert!(sender.is_closed());
        assert!(!sender.send(Command::Receive));
    }

    #[test]
    fn command_names_are_snake_case() {
        let play = Command::Play { folder: Folder::Outbox, id: MessageId(3) };
        assert_eq!(play.name(), "play");
        assert_eq!(Command::MarkDelivered(BundleId {
            source: "dtn://n/a".parse().unwrap(),
            timestamp: 1,
            sequence: 2,
        }).name(), "mark_delivered");
    }
}
