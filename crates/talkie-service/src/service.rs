// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service construction, the bind-style handle and graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use talkie_config::TalkieConfig;
use talkie_core::{
    AudioDevice, Endpoint, Folder, MailboxStore, MessageId, NetworkClient, NetworkSession,
    NotificationSink, PreferenceSource, Registration, ServiceStatus, TalkieError,
};

use crate::command::{command_channel, Command, CommandSender};
use crate::dispatch::Dispatcher;
use crate::notification::NotificationPresenter;
use crate::playback::PlaybackCoordinator;
use crate::preferences::spawn_autoplay_listener;
use crate::proximity::ProximityMonitor;
use crate::receive::BundleReceiver;

/// External collaborators injected into the service.
pub struct ServiceDeps {
    pub network: Arc<dyn NetworkClient>,
    pub mailbox: Arc<dyn MailboxStore>,
    pub audio: Arc<dyn AudioDevice>,
    pub notifications: Arc<dyn NotificationSink>,
    pub preferences: Arc<dyn PreferenceSource>,
}

/// What a UI binds to: the mailbox, the registration status and the command queue.
#[derive(Clone)]
pub struct TalkieHandle {
    mailbox: Arc<dyn MailboxStore>,
    status: ServiceStatus,
    commands: CommandSender,
}

impl TalkieHandle {
    pub fn mailbox(&self) -> &Arc<dyn MailboxStore> {
        &self.mailbox
    }

    /// Sticky outcome of the network registration.
    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn commands(&self) -> &CommandSender {
        &self.commands
    }

    /// The daemon signalled pending bundles.
    pub fn notify_pending(&self) -> bool {
        self.commands.send(Command::Receive)
    }

    pub fn play(&self, folder: Folder, id: MessageId) -> bool {
        self.commands.send(Command::Play { folder, id })
    }

    /// Hand over a finished recording for sending.
    pub fn send_recording(&self, file: impl Into<PathBuf>, destination: Endpoint) -> bool {
        self.commands.send(Command::RecordedOutbound {
            file: file.into(),
            destination,
        })
    }
}

/// A running Talkie service.
pub struct TalkieService {
    handle: TalkieHandle,
    proximity: Arc<ProximityMonitor>,
    session: Option<Arc<dyn NetworkSession>>,
    audio: Arc<dyn AudioDevice>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    listener: JoinHandle<()>,
}

impl TalkieService {
    /// Register with the network, then start the command worker and listeners.
    ///
    /// Registration failures do not fail startup; they are recorded in
    /// [`TalkieHandle::status`] and network-bound commands fail afterwards.
    pub async fn start(config: &TalkieConfig, deps: ServiceDeps) -> Result<Self, TalkieError> {
        let registration = registration(config)?;
        let (session, status) = match deps.network.initialize(&registration).await {
            Ok(session) => {
                info!(endpoint = %registration.endpoint, "registered with DTN daemon");
                (Some(session), ServiceStatus::None)
            }
            Err(TalkieError::PermissionDenied) => {
                error!("DTN daemon refused the registration");
                (None, ServiceStatus::PermissionDenied)
            }
            Err(e) => {
                error!(error = %e, "DTN service not available");
                (None, ServiceStatus::ServiceUnavailable)
            }
        };

        let spool_dir = config.storage.spool_path();
        tokio::fs::create_dir_all(&spool_dir).await?;

        let (commands, queue) = command_channel();
        let cancel = CancellationToken::new();
        let proximity = Arc::new(ProximityMonitor::new());

        let dispatcher = Dispatcher::new(
            Arc::clone(&deps.mailbox),
            session.clone(),
            Arc::clone(&deps.preferences),
            BundleReceiver::new(spool_dir, commands.clone()),
            PlaybackCoordinator::new(Arc::clone(&deps.audio), config.playback.completion_timeout()),
            Arc::clone(&proximity),
            NotificationPresenter::new(
                deps.notifications,
                Arc::clone(&deps.mailbox),
                Arc::clone(&deps.preferences),
            ),
            commands.clone(),
        );
        let worker = tokio::spawn(dispatcher.run(queue, cancel.clone()));
        let listener = spawn_autoplay_listener(
            deps.preferences.subscribe(),
            commands.clone(),
            cancel.clone(),
        );

        if deps.preferences.autoplay() {
            commands.send(Command::PlayNext {
                folder: Folder::Inbox,
            });
        }

        info!(%status, "talkie service started");
        Ok(Self {
            handle: TalkieHandle {
                mailbox: deps.mailbox,
                status,
                commands,
            },
            proximity,
            session,
            audio: deps.audio,
            cancel,
            worker,
            listener,
        })
    }

    pub fn handle(&self) -> TalkieHandle {
        self.handle.clone()
    }

    /// Sensor producers feed readings here.
    pub fn proximity(&self) -> &Arc<ProximityMonitor> {
        &self.proximity
    }

    /// Stop the worker after its current command, then release every collaborator.
    pub async fn shutdown(self) -> Result<(), TalkieError> {
        info!("shutting down talkie service");
        self.cancel.cancel();
        if let Err(e) = self.worker.await {
            warn!(error = %e, "command worker ended abnormally");
        }
        if let Err(e) = self.listener.await {
            warn!(error = %e, "preference listener ended abnormally");
        }

        if let Some(session) = &self.session
            && let Err(e) = session.terminate().await
        {
            warn!(error = %e, "failed to terminate DTN session");
        }
        self.audio.release();
        self.handle.mailbox.close().await?;
        info!("talkie service stopped");
        Ok(())
    }
}

fn registration(config: &TalkieConfig) -> Result<Registration, TalkieError> {
    let group = config.network.group_endpoint.trim();
    let groups = if group.is_empty() {
        Vec::new()
    } else {
        vec![group.parse::<Endpoint>()?]
    };
    Ok(Registration {
        endpoint: config.network.endpoint.clone(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_includes_group_endpoint() {
        let config = TalkieConfig::default();
        let reg = registration(&config).unwrap();
        assert_eq!(reg.endpoint, "dtalkie");
        assert_eq!(reg.groups.len(), 1);
        assert_eq!(reg.groups[0].as_str(), "dtn://dtalkie.dtn/broadcast");
    }

    #[test]
    fn empty_group_endpoint_registers_no_groups() {
        let mut config = TalkieConfig::default();
        config.network.group_endpoint = String::new();
        assert!(registration(&config).unwrap().groups.is_empty());
    }

    #[test]
    fn malformed_group_endpoint_is_rejected() {
        let mut config = TalkieConfig::default();
        config.network.group_endpoint = "broadcast".to_string();
        assert!(matches!(
            registration(&config),
            Err(TalkieError::InvalidEndpoint(_))
        ));
    }
}
