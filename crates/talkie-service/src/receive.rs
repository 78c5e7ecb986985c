// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle receive adapter.
//!
//! [`BundleReceiver`] is handed to `NetworkSession::query_next` and creates
//! one [`InboundTransfer`] per bundle. The transfer streams the payload block
//! into a temporary `msg*.3gp` file in the spool directory. On transfer end
//! the file is kept and a [`Command::ReceivedInbound`] is enqueued; every
//! finished transfer also enqueues exactly one [`Command::MarkDelivered`].
//!
//! A transfer dropped before its end is an abort: the temporary file is
//! closed and removed by its guard.

use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};

use talkie_core::{
    BlockDescriptor, BundleMeta, NewMessage, TalkieError, TransferFactory, TransferHandler,
    TransferMode,
};

use crate::command::{Command, CommandSender};

/// Creates per-transfer state machines writing into `spool_dir`.
#[derive(Debug, Clone)]
pub struct BundleReceiver {
    spool_dir: PathBuf,
    commands: CommandSender,
}

impl BundleReceiver {
    pub fn new(spool_dir: impl Into<PathBuf>, commands: CommandSender) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            commands,
        }
    }
}

impl TransferFactory for BundleReceiver {
    fn on_transfer_start(&self, meta: BundleMeta) -> Box<dyn TransferHandler> {
        debug!(bundle = %meta.id, destination = %meta.destination, "transfer started");
        Box::new(InboundTransfer::new(
            meta,
            self.spool_dir.clone(),
            self.commands.clone(),
        ))
    }
}

/// Lifecycle of one inbound transfer. A transfer starts out `TransferOpen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    TransferOpen,
    BlockOpen(TransferMode),
    Closed,
}

/// State of one in-flight inbound bundle.
pub struct InboundTransfer {
    meta: BundleMeta,
    spool_dir: PathBuf,
    commands: CommandSender,
    state: TransferState,
    /// Open payload sink while a payload block is streaming.
    sink: Option<NamedTempFile>,
    /// Closed payload file, deleted on drop until kept.
    payload: Option<TempPath>,
}

impl InboundTransfer {
    fn new(meta: BundleMeta, spool_dir: PathBuf, commands: CommandSender) -> Self {
        Self {
            meta,
            spool_dir,
            commands,
            state: TransferState::TransferOpen,
            sink: None,
            payload: None,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    fn create_payload_file(&self) -> Result<NamedTempFile, TalkieError> {
        tempfile::Builder::new()
            .prefix("msg")
            .suffix(".3gp")
            .tempfile_in(&self.spool_dir)
            .map_err(|e| TalkieError::Transfer {
                message: format!("cannot create payload file in {}", self.spool_dir.display()),
                source: Some(Box::new(e)),
            })
    }

    /// Flush and close the open sink, keeping the path.
    fn close_sink(&mut self) {
        if let Some(mut file) = self.sink.take() {
            match file.flush() {
                Ok(()) => self.payload = Some(file.into_temp_path()),
                Err(e) => warn!(
                    bundle = %self.meta.id,
                    error = %e,
                    "failed to flush payload file, discarding it"
                ),
            }
        }
    }
}

impl TransferHandler for InboundTransfer {
    fn on_block_start(&mut self, block: &BlockDescriptor) -> TransferMode {
        if self.state != TransferState::TransferOpen {
            warn!(bundle = %self.meta.id, state = ?self.state, "block start in invalid state, ignored");
            return TransferMode::Ignore;
        }

        let mode = if block.is_payload() && self.sink.is_none() && self.payload.is_none() {
            match self.create_payload_file() {
                Ok(file) => {
                    debug!(bundle = %self.meta.id, path = %file.path().display(), "streaming payload to file");
                    self.sink = Some(file);
                    TransferMode::StreamToFile
                }
                Err(e) => {
                    warn!(bundle = %self.meta.id, error = %e, "payload will be dropped");
                    TransferMode::Ignore
                }
            }
        } else {
            TransferMode::Ignore
        };

        debug!(
            bundle = %self.meta.id,
            block_type = block.block_type,
            length = block.length,
            ?mode,
            "block started"
        );
        self.state = TransferState::BlockOpen(mode);
        mode
    }

    fn payload_sink(&mut self) -> Option<&mut dyn Write> {
        match self.state {
            TransferState::BlockOpen(TransferMode::StreamToFile) => {
                self.sink.as_mut().map(|file| file as &mut dyn Write)
            }
            _ => None,
        }
    }

    fn on_block_bytes(&mut self, chunk: &[u8]) {
        match self.state {
            TransferState::BlockOpen(TransferMode::Ignore) => {
                debug!(bundle = %self.meta.id, bytes = chunk.len(), "discarding non-payload bytes");
            }
            state => {
                warn!(bundle = %self.meta.id, ?state, "block bytes in invalid state, ignored");
            }
        }
    }

    fn on_block_end(&mut self) {
        if !matches!(self.state, TransferState::BlockOpen(_)) {
            warn!(bundle = %self.meta.id, state = ?self.state, "block end without block start, ignored");
            return;
        }
        self.close_sink();
        self.state = TransferState::TransferOpen;
    }

    fn on_progress(&mut self, current: u64, total: u64) {
        debug!(bundle = %self.meta.id, current, total, "transfer progress");
    }

    fn on_transfer_end(mut self: Box<Self>) {
        match self.state {
            TransferState::Closed => {
                warn!(bundle = %self.meta.id, "transfer end on closed transfer, ignored");
                return;
            }
            TransferState::BlockOpen(_) => {
                warn!(bundle = %self.meta.id, "transfer ended with an open block");
                self.close_sink();
            }
            TransferState::TransferOpen => {}
        }
        self.state = TransferState::Closed;

        if let Some(path) = self.payload.take() {
            match path.keep() {
                Ok(file) => {
                    info!(bundle = %self.meta.id, file = %file.display(), "voice message received");
                    self.commands.send(Command::ReceivedInbound(NewMessage {
                        source: self.meta.source().clone(),
                        destination: self.meta.destination.clone(),
                        created: self.meta.created(),
                        received: Utc::now(),
                        file,
                    }));
                }
                Err(e) => {
                    warn!(bundle = %self.meta.id, error = %e, "failed to keep payload file");
                }
            }
        } else {
            debug!(bundle = %self.meta.id, "transfer carried no payload");
        }

        self.commands.send(Command::MarkDelivered(self.meta.id.clone()));
    }
}

impl Drop for InboundTransfer {
    fn drop(&mut self) {
        if self.state != TransferState::Closed {
            // Guards in `sink` and `payload` delete the partial file.
            warn!(bundle = %self.meta.id, "transfer aborted, partial payload discarded");
        }
    }
}
