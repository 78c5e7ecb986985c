// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end service tests.
//!
//! `TestHarness` starts a complete [`TalkieService`] against a temp SQLite
//! mailbox and spool directory, with mock network, audio and notification
//! collaborators.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use talkie_config::model::{PlaybackConfig, PreferencesConfig, StorageConfig};
use talkie_config::TalkieConfig;
use talkie_core::{Endpoint, Folder, MailboxStore, MessageId, TalkieError};
use talkie_service::{ServiceDeps, SharedPreferences, TalkieHandle, TalkieService};
use talkie_storage::SqliteMailbox;

use crate::mock_audio::{AudioMode, MockAudioDevice};
use crate::mock_network::{MockNetworkClient, MockNetworkSession, NetworkMode, ScriptedBundle};
use crate::mock_notifications::RecordingNotifications;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    autoplay: bool,
    network: NetworkMode,
    audio: AudioMode,
    play_time: Duration,
    completion_timeout_secs: u64,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            autoplay: false,
            network: NetworkMode::Available,
            audio: AudioMode::Complete,
            play_time: Duration::from_millis(20),
            completion_timeout_secs: 5,
        }
    }

    pub fn with_autoplay(mut self, enabled: bool) -> Self {
        self.autoplay = enabled;
        self
    }

    pub fn with_network(mut self, mode: NetworkMode) -> Self {
        self.network = mode;
        self
    }

    pub fn with_audio(mut self, mode: AudioMode) -> Self {
        self.audio = mode;
        self
    }

    pub fn with_play_time(mut self, play_time: Duration) -> Self {
        self.play_time = play_time;
        self
    }

    pub fn with_completion_timeout_secs(mut self, secs: u64) -> Self {
        self.completion_timeout_secs = secs;
        self
    }

    /// Open the mailbox and start the service.
    pub async fn build(self) -> Result<TestHarness, TalkieError> {
        let temp_dir = tempfile::TempDir::new()?;
        let config = TalkieConfig {
            storage: StorageConfig {
                database_path: temp_dir.path().join("talkie.db").to_string_lossy().into_owned(),
                wal_mode: true,
                spool_dir: temp_dir.path().join("spool").to_string_lossy().into_owned(),
            },
            playback: PlaybackConfig {
                completion_timeout_secs: self.completion_timeout_secs,
            },
            preferences: PreferencesConfig {
                autoplay: self.autoplay,
                ..PreferencesConfig::default()
            },
            ..TalkieConfig::default()
        };

        let mailbox = Arc::new(SqliteMailbox::open(&config.storage).await?);
        let client = Arc::new(MockNetworkClient::new(self.network));
        let audio = Arc::new(MockAudioDevice::new(self.audio).with_play_time(self.play_time));
        let notifications = Arc::new(RecordingNotifications::new());
        let preferences = Arc::new(SharedPreferences::new(&config.preferences));

        let service = TalkieService::start(
            &config,
            ServiceDeps {
                network: client.clone(),
                mailbox: mailbox.clone(),
                audio: audio.clone(),
                notifications: notifications.clone(),
                preferences: preferences.clone(),
            },
        )
        .await?;

        Ok(TestHarness {
            service: Some(service),
            mailbox,
            client,
            audio,
            notifications,
            preferences,
            config,
            temp_dir,
        })
    }
}

/// A running service plus handles to every mock behind it.
pub struct TestHarness {
    service: Option<TalkieService>,
    mailbox: Arc<SqliteMailbox>,
    client: Arc<MockNetworkClient>,
    audio: Arc<MockAudioDevice>,
    notifications: Arc<RecordingNotifications>,
    preferences: Arc<SharedPreferences>,
    config: TalkieConfig,
    temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings: network up, autoplay off.
    pub async fn new() -> Result<Self, TalkieError> {
        Self::builder().build().await
    }

    fn running(&self) -> &TalkieService {
        match &self.service {
            Some(service) => service,
            None => panic!("service already shut down"),
        }
    }

    pub fn handle(&self) -> TalkieHandle {
        self.running().handle()
    }

    pub fn service(&self) -> &TalkieService {
        self.running()
    }

    pub fn mailbox(&self) -> &Arc<SqliteMailbox> {
        &self.mailbox
    }

    pub fn client(&self) -> &Arc<MockNetworkClient> {
        &self.client
    }

    pub fn session(&self) -> Arc<MockNetworkSession> {
        self.client.session()
    }

    pub fn audio(&self) -> &Arc<MockAudioDevice> {
        &self.audio
    }

    pub fn notifications(&self) -> &Arc<RecordingNotifications> {
        &self.notifications
    }

    pub fn preferences(&self) -> &Arc<SharedPreferences> {
        &self.preferences
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.config.storage.spool_path()
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Inject a bundle and tell the service it is pending.
    pub fn deliver(&self, bundle: ScriptedBundle) {
        self.session().inject(bundle);
        self.handle().notify_pending();
    }

    /// Write a recording file and hand it to the service for sending.
    pub fn record(&self, name: &str, bytes: &[u8], destination: &str) -> PathBuf {
        let path = self.temp_path().join(name);
        if let Err(e) = std::fs::write(&path, bytes) {
            panic!("cannot write recording {}: {e}", path.display());
        }
        let destination: Endpoint = match destination.parse() {
            Ok(d) => d,
            Err(e) => panic!("invalid destination: {e}"),
        };
        self.handle().send_recording(&path, destination);
        path
    }

    pub async fn unread(&self) -> u64 {
        self.mailbox
            .unread_count(Folder::Inbox)
            .await
            .unwrap_or_else(|e| panic!("unread_count failed: {e}"))
    }

    pub async fn is_read(&self, id: MessageId) -> bool {
        match self.mailbox.get(Folder::Inbox, id).await {
            Ok(Some(message)) => message.read,
            Ok(None) => panic!("message {id} missing"),
            Err(e) => panic!("get failed: {e}"),
        }
    }

    /// Stop the service and release every collaborator.
    pub async fn shutdown(&mut self) -> Result<(), TalkieError> {
        match self.service.take() {
            Some(service) => service.shutdown().await,
            None => Ok(()),
        }
    }
}

/// Poll `check` until it returns true or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
