// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Playback coordinator.
//!
//! Owns the single process-wide playback slot. [`PlaybackCoordinator::play`]
//! prepares the audio device with a per-session listener and waits, with a
//! bounded timeout, for the listener to report a terminal outcome over a
//! oneshot channel. The listener runs on the device's callback thread.
//! Continuing with the next message is the caller's job.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use talkie_core::{AudioDevice, AudioRoute, Cue, PlaybackListener, TalkieError};

/// Terminal state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Failed,
}

/// Serializes access to the audio device.
pub struct PlaybackCoordinator {
    device: Arc<dyn AudioDevice>,
    playing: Arc<AtomicBool>,
    completion_timeout: Duration,
}

impl PlaybackCoordinator {
    pub fn new(device: Arc<dyn AudioDevice>, completion_timeout: Duration) -> Self {
        Self {
            device,
            playing: Arc::new(AtomicBool::new(false)),
            completion_timeout,
        }
    }

    /// True while a session holds the playback slot.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Render `file` on `route` and wait for the session to end.
    ///
    /// Fails with [`TalkieError::PlaybackBusy`] if another session is active
    /// and with the device error if `prepare` fails synchronously. Device
    /// errors, a dropped listener and the completion timeout all resolve to
    /// [`PlaybackOutcome::Failed`].
    pub async fn play(&self, file: &Path, route: AudioRoute) -> Result<PlaybackOutcome, TalkieError> {
        if self
            .playing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TalkieError::PlaybackBusy);
        }

        let (tx, rx) = oneshot::channel();
        let listener = Arc::new(SessionListener {
            device: Arc::clone(&self.device),
            playing: Arc::clone(&self.playing),
            route,
            outcome: Mutex::new(Some(tx)),
        });
        let session: Weak<SessionListener> = Arc::downgrade(&listener);

        debug!(file = %file.display(), %route, "preparing playback");
        if let Err(e) = self.device.prepare(file, route, listener) {
            self.device.reset();
            self.playing.store(false, Ordering::Release);
            return Err(e);
        }

        match tokio::time::timeout(self.completion_timeout, rx).await {
            Ok(Ok(outcome)) => {
                debug!(?outcome, "playback session ended");
                Ok(outcome)
            }
            Ok(Err(_)) => {
                warn!(file = %file.display(), "audio device dropped the playback listener");
                self.abandon(&session);
                Ok(PlaybackOutcome::Failed)
            }
            Err(_) => {
                warn!(
                    file = %file.display(),
                    timeout_secs = self.completion_timeout.as_secs(),
                    "playback did not complete in time"
                );
                self.abandon(&session);
                Ok(PlaybackOutcome::Failed)
            }
        }
    }

    /// Detach a session that will not be awaited any more and free the slot.
    fn abandon(&self, session: &Weak<SessionListener>) {
        if let Some(listener) = session.upgrade() {
            // Late callbacks of this session become no-ops.
            listener.take_outcome();
        }
        self.device.reset();
        self.playing.store(false, Ordering::Release);
    }
}

/// Device callbacks for one playback session.
struct SessionListener {
    device: Arc<dyn AudioDevice>,
    playing: Arc<AtomicBool>,
    route: AudioRoute,
    outcome: Mutex<Option<oneshot::Sender<PlaybackOutcome>>>,
}

impl SessionListener {
    fn take_outcome(&self) -> Option<oneshot::Sender<PlaybackOutcome>> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn is_live(&self) -> bool {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn finish(&self, tx: oneshot::Sender<PlaybackOutcome>, outcome: PlaybackOutcome) {
        self.device.reset();
        self.playing.store(false, Ordering::Release);
        // The waiter may have given up already.
        let _ = tx.send(outcome);
    }
}

impl PlaybackListener for SessionListener {
    fn on_prepared(&self) {
        if !self.is_live() {
            return;
        }
        self.device.play_cue(Cue::Beep, self.route);
        if let Err(e) = self.device.start() {
            self.on_error(e);
        }
    }

    fn on_completion(&self) {
        let Some(tx) = self.take_outcome() else {
            return;
        };
        self.device.play_cue(Cue::Confirm, self.route);
        self.finish(tx, PlaybackOutcome::Completed);
        info!("playback completed");
    }

    fn on_error(&self, error: TalkieError) {
        let Some(tx) = self.take_outcome() else {
            return;
        };
        warn!(error = %error, "playback failed");
        self.finish(tx, PlaybackOutcome::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Device that records calls and lets the test fire callbacks by hand.
    #[derive(Default)]
    struct ManualDevice {
        listener: StdMutex<Option<Arc<dyn PlaybackListener>>>,
        calls: StdMutex<Vec<String>>,
        fail_prepare: bool,
    }

    impl ManualDevice {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn listener(&self) -> Arc<dyn PlaybackListener> {
            self.listener.lock().unwrap().clone().expect("prepared")
        }

        fn drop_listener(&self) {
            self.listener.lock().unwrap().take();
        }
    }

    impl AudioDevice for ManualDevice {
        fn prepare(
            &self,
            _path: &Path,
            route: AudioRoute,
            listener: Arc<dyn PlaybackListener>,
        ) -> Result<(), TalkieError> {
            self.calls.lock().unwrap().push(format!("prepare:{route}"));
            if self.fail_prepare {
                return Err(TalkieError::playback("unsupported format"));
            }
            *self.listener.lock().unwrap() = Some(listener);
            Ok(())
        }

        fn start(&self) -> Result<(), TalkieError> {
            self.calls.lock().unwrap().push("start".into());
            Ok(())
        }

        fn play_cue(&self, cue: Cue, route: AudioRoute) {
            self.calls.lock().unwrap().push(format!("cue:{cue}:{route}"));
        }

        fn reset(&self) {
            self.calls.lock().unwrap().push("reset".into());
        }

        fn release(&self) {
            self.calls.lock().unwrap().push("release".into());
        }
    }

    fn coordinator(device: Arc<ManualDevice>, timeout: Duration) -> Arc<PlaybackCoordinator> {
        Arc::new(PlaybackCoordinator::new(device, timeout))
    }

    async fn wait_until_prepared(device: &ManualDevice) {
        while device.listener.lock().unwrap().is_none() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn completion_plays_beep_and_confirm_cues() {
        let device = Arc::new(ManualDevice::default());
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(5));

        let task = {
            let playback = Arc::clone(&playback);
            tokio::spawn(async move { playback.play(Path::new("/m.3gp"), AudioRoute::Speaker).await })
        };
        wait_until_prepared(&device).await;
        assert!(playback.is_playing());

        let listener = device.listener();
        listener.on_prepared();
        listener.on_completion();

        assert_eq!(task.await.unwrap().unwrap(), PlaybackOutcome::Completed);
        assert!(!playback.is_playing());
        assert_eq!(
            device.calls(),
            vec!["prepare:speaker", "cue:beep:speaker", "start", "cue:confirm:speaker", "reset"]
        );
    }

    #[tokio::test]
    async fn concurrent_play_is_rejected_as_busy() {
        let device = Arc::new(ManualDevice::default());
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(5));

        let first = {
            let playback = Arc::clone(&playback);
            tokio::spawn(async move { playback.play(Path::new("/a.3gp"), AudioRoute::Earpiece).await })
        };
        wait_until_prepared(&device).await;

        let second = playback.play(Path::new("/b.3gp"), AudioRoute::Earpiece).await;
        assert!(matches!(second, Err(TalkieError::PlaybackBusy)));

        device.listener().on_completion();
        assert_eq!(first.await.unwrap().unwrap(), PlaybackOutcome::Completed);
    }

    #[tokio::test]
    async fn device_error_resolves_as_failed() {
        let device = Arc::new(ManualDevice::default());
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(5));

        let task = {
            let playback = Arc::clone(&playback);
            tokio::spawn(async move { playback.play(Path::new("/x.3gp"), AudioRoute::Speaker).await })
        };
        wait_until_prepared(&device).await;
        device.listener().on_error(TalkieError::playback("decoder crashed"));

        assert_eq!(task.await.unwrap().unwrap(), PlaybackOutcome::Failed);
        assert!(!playback.is_playing());
        assert_eq!(device.calls().last().map(String::as_str), Some("reset"));
        assert!(!device.calls().contains(&"cue:confirm:speaker".to_string()));
    }

    #[tokio::test]
    async fn synchronous_prepare_failure_releases_slot() {
        let device = Arc::new(ManualDevice {
            fail_prepare: true,
            ..Default::default()
        });
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(5));

        let err = playback
            .play(Path::new("/bad.3gp"), AudioRoute::Speaker)
            .await
            .unwrap_err();
        assert!(matches!(err, TalkieError::Playback { .. }));
        assert!(!playback.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_frees_slot_and_ignores_late_completion() {
        let device = Arc::new(ManualDevice::default());
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(600));

        let outcome = playback
            .play(Path::new("/hang.3gp"), AudioRoute::Speaker)
            .await
            .unwrap();
        assert_eq!(outcome, PlaybackOutcome::Failed);
        assert!(!playback.is_playing());

        // A completion arriving after the timeout must not touch the slot.
        device.listener().on_completion();
        assert!(!device.calls().contains(&"cue:confirm:speaker".to_string()));
    }

    #[tokio::test]
    async fn dropped_listener_resolves_as_failed() {
        let device = Arc::new(ManualDevice::default());
        let playback = coordinator(Arc::clone(&device), Duration::from_secs(5));

        let task = {
            let playback = Arc::clone(&playback);
            tokio::spawn(async move { playback.play(Path::new("/d.3gp"), AudioRoute::Speaker).await })
        };
        wait_until_prepared(&device).await;
        device.drop_listener();

        assert_eq!(task.await.unwrap().unwrap(), PlaybackOutcome::Failed);
        assert!(!playback.is_playing());
    }
}
