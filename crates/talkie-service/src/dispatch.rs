// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single FIFO command worker.
//!
//! Commands run one at a time in arrival order. Each command logs and drops
//! its own errors; only cancellation or a closed queue stops the worker. A
//! command in flight when cancellation arrives runs to completion.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use talkie_core::types::OUTBOUND_LIFETIME_SECS;
use talkie_core::{
    BundleId, Endpoint, Folder, MailboxStore, MessageId, NetworkSession, NewMessage,
    PreferenceSource, TalkieError,
};

use crate::command::{Command, CommandSender};
use crate::notification::NotificationPresenter;
use crate::playback::{PlaybackCoordinator, PlaybackOutcome};
use crate::proximity::ProximityMonitor;
use crate::receive::BundleReceiver;

/// State owned by the command worker.
pub struct Dispatcher {
    mailbox: Arc<dyn MailboxStore>,
    session: Option<Arc<dyn NetworkSession>>,
    preferences: Arc<dyn PreferenceSource>,
    receiver: BundleReceiver,
    playback: PlaybackCoordinator,
    proximity: Arc<ProximityMonitor>,
    notifications: NotificationPresenter,
    commands: CommandSender,
    /// Message queued for playback by PlayNext but not yet played.
    autoplay_pending: Option<MessageId>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mailbox: Arc<dyn MailboxStore>,
        session: Option<Arc<dyn NetworkSession>>,
        preferences: Arc<dyn PreferenceSource>,
        receiver: BundleReceiver,
        playback: PlaybackCoordinator,
        proximity: Arc<ProximityMonitor>,
        notifications: NotificationPresenter,
        commands: CommandSender,
    ) -> Self {
        Self {
            mailbox,
            session,
            preferences,
            receiver,
            playback,
            proximity,
            notifications,
            commands,
            autoplay_pending: None,
        }
    }

    /// Process commands until `cancel` fires or every sender is gone.
    pub async fn run(mut self, mut queue: mpsc::UnboundedReceiver<Command>, cancel: CancellationToken) {
        info!("command worker running");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping command worker");
                    break;
                }
                command = queue.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("command queue closed");
                        break;
                    }
                },
            }
        }
    }

    /// Execute one command, logging its failure.
    pub async fn handle(&mut self, command: Command) {
        let name = command.name();
        debug!(command = name, "executing command");
        if let Err(e) = self.execute(command).await {
            error!(command = name, error = %e, "command failed");
        }
    }

    async fn execute(&mut self, command: Command) -> Result<(), TalkieError> {
        match command {
            Command::Receive => self.receive().await,
            Command::ReceivedInbound(message) => self.received_inbound(message).await,
            Command::Play { folder, id } => self.play(folder, id).await,
            Command::PlayNext { folder } => self.play_next(folder).await,
            Command::RecordedOutbound { file, destination } => {
                self.recorded_outbound(&file, &destination).await
            }
            Command::MarkDelivered(id) => self.mark_delivered(&id).await,
            Command::AutoplayChanged(enabled) => self.autoplay_changed(enabled).await,
        }
    }

    fn session(&self) -> Result<&Arc<dyn NetworkSession>, TalkieError> {
        self.session
            .as_ref()
            .ok_or_else(|| TalkieError::network("no DTN session"))
    }

    async fn receive(&mut self) -> Result<(), TalkieError> {
        let session = Arc::clone(self.session()?);
        let mut count = 0usize;
        while session.query_next(&self.receiver).await? {
            count += 1;
        }
        debug!(count, "pending bundles drained");
        Ok(())
    }

    async fn received_inbound(&mut self, message: NewMessage) -> Result<(), TalkieError> {
        let id = self.mailbox.insert(Folder::Inbox, &message).await?;
        info!(%id, source = %message.source, "message added to inbox");
        self.refresh_notification(true).await;
        self.commands.send(Command::PlayNext {
            folder: Folder::Inbox,
        });
        Ok(())
    }

    async fn play(&mut self, folder: Folder, id: MessageId) -> Result<(), TalkieError> {
        if self.autoplay_pending == Some(id) {
            self.autoplay_pending = None;
        }

        let result = self.play_message(folder, id).await;
        // A message that could not be marked read would be picked again.
        if !matches!(result, Err(TalkieError::Storage { .. })) {
            self.commands.send(Command::PlayNext {
                folder: Folder::Inbox,
            });
        }
        result
    }

    /// Mark `id` read and render it; completed, failed and timed-out
    /// playbacks all end here.
    async fn play_message(&mut self, folder: Folder, id: MessageId) -> Result<(), TalkieError> {
        self.mailbox.mark_read(folder, id, true).await?;
        let message = self
            .mailbox
            .get(folder, id)
            .await?
            .ok_or(TalkieError::NotFound { folder, id })?;

        let route = self.proximity.route();
        let result = self.playback.play(&message.file, route).await;

        if let Err(e) = self.mailbox.mark_read(folder, id, true).await {
            warn!(%id, error = %e, "failed to mark message read after playback");
        }
        self.refresh_notification(false).await;

        match result? {
            PlaybackOutcome::Completed => info!(%folder, %id, %route, "message played"),
            PlaybackOutcome::Failed => warn!(%folder, %id, "message playback failed"),
        }
        Ok(())
    }

    async fn play_next(&mut self, folder: Folder) -> Result<(), TalkieError> {
        if !self.preferences.autoplay() {
            return Ok(());
        }
        if let Some(pending) = self.autoplay_pending {
            debug!(%pending, "autoplay already queued a message");
            return Ok(());
        }
        if let Some(next) = self.mailbox.next_unread(folder).await? {
            debug!(id = %next.id, "queueing next unread message");
            self.autoplay_pending = Some(next.id);
            self.commands.send(Command::Play {
                folder,
                id: next.id,
            });
        }
        Ok(())
    }

    async fn recorded_outbound(&mut self, file: &Path, destination: &Endpoint) -> Result<(), TalkieError> {
        let session = Arc::clone(self.session()?);
        let payload = tokio::fs::File::open(file).await?.into_std().await;
        let bundle = session
            .send(destination, OUTBOUND_LIFETIME_SECS, payload)
            .await?;
        info!(%bundle, %destination, "recording sent");
        if let Err(e) = tokio::fs::remove_file(file).await {
            warn!(file = %file.display(), error = %e, "failed to delete sent recording");
        }
        Ok(())
    }

    async fn mark_delivered(&mut self, id: &BundleId) -> Result<(), TalkieError> {
        self.session()?.delivered(id).await?;
        debug!(bundle = %id, "bundle marked delivered");
        Ok(())
    }

    async fn autoplay_changed(&mut self, enabled: bool) -> Result<(), TalkieError> {
        self.refresh_notification(false).await;
        if enabled {
            self.play_next(Folder::Inbox).await?;
        }
        Ok(())
    }

    async fn refresh_notification(&self, alert: bool) {
        if let Err(e) = self.notifications.refresh(alert).await {
            warn!(error = %e, "failed to update unread notification");
        }
    }
}
