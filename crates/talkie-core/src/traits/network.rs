// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for the DTN daemon bridge and the streaming receive contract.
//!
//! The daemon itself is an external collaborator. These traits describe only
//! what the voice-message service consumes from it.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TalkieError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BlockDescriptor, BundleId, BundleMeta, Endpoint, Registration, TransferMode};

/// Entry point to the DTN daemon.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Registers the application and opens a session.
    ///
    /// Fails with [`TalkieError::ServiceUnavailable`] when the daemon cannot be
    /// reached and [`TalkieError::PermissionDenied`] when registration is refused.
    async fn initialize(
        &self,
        registration: &Registration,
    ) -> Result<Arc<dyn NetworkSession>, TalkieError>;
}

/// An open session with the DTN daemon.
#[async_trait]
pub trait NetworkSession: PluginAdapter {
    /// Delivers the next pending inbound bundle through `receiver`.
    ///
    /// Returns `false` when nothing was pending.
    async fn query_next(&self, receiver: &dyn TransferFactory) -> Result<bool, TalkieError>;

    /// Sends `payload` to `destination` with the given lifetime.
    async fn send(
        &self,
        destination: &Endpoint,
        lifetime_secs: u64,
        payload: File,
    ) -> Result<BundleId, TalkieError>;

    /// Tells the daemon that a received bundle has been consumed.
    async fn delivered(&self, id: &BundleId) -> Result<(), TalkieError>;

    /// Closes the session.
    async fn terminate(&self) -> Result<(), TalkieError>;
}

/// Creates the per-transfer receive state when the daemon starts a transfer.
pub trait TransferFactory: Send + Sync {
    fn on_transfer_start(&self, meta: BundleMeta) -> Box<dyn TransferHandler>;
}

/// Callbacks for one inbound transfer, in the order
/// block start → (sink writes | bytes)* → block end, repeated per block,
/// then transfer end.
///
/// Dropping a handler without calling [`TransferHandler::on_transfer_end`]
/// aborts the transfer.
pub trait TransferHandler: Send {
    /// Chooses how the bytes of the block are delivered.
    fn on_block_start(&mut self, block: &BlockDescriptor) -> TransferMode;

    /// Sink for block bytes in [`TransferMode::StreamToFile`].
    fn payload_sink(&mut self) -> Option<&mut dyn Write>;

    /// Block bytes in [`TransferMode::Ignore`].
    fn on_block_bytes(&mut self, chunk: &[u8]);

    fn on_block_end(&mut self);

    fn on_progress(&mut self, current: u64, total: u64);

    /// Completes the transfer.
    fn on_transfer_end(self: Box<Self>);
}
