// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock audio device.
//!
//! Fires the listener callbacks from its own threads, like a real media
//! player, and records every call for assertions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use talkie_core::{AudioDevice, AudioRoute, Cue, PlaybackListener, TalkieError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How the device behaves on `prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// Prepare, then complete after the configured play time.
    #[default]
    Complete,
    /// `prepare` itself fails.
    RejectPrepare,
    /// Prepare succeeds, then the decoder reports an error.
    ErrorAfterPrepare,
    /// Never calls back.
    Hang,
}

/// Everything the device was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    Prepared { file: PathBuf, route: AudioRoute },
    Started,
    Cue { cue: Cue, route: AudioRoute },
    Reset,
    Released,
}

#[derive(Default)]
struct State {
    listener: Option<Arc<dyn PlaybackListener>>,
    events: Vec<AudioEvent>,
    active: usize,
    max_active: usize,
}

/// Mock playback device.
pub struct MockAudioDevice {
    mode: Mutex<AudioMode>,
    play_time: Duration,
    state: Arc<Mutex<State>>,
}

impl MockAudioDevice {
    pub fn new(mode: AudioMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            play_time: Duration::from_millis(20),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn with_play_time(mut self, play_time: Duration) -> Self {
        self.play_time = play_time;
        self
    }

    pub fn set_mode(&self, mode: AudioMode) {
        *lock(&self.mode) = mode;
    }

    pub fn events(&self) -> Vec<AudioEvent> {
        lock(&self.state).events.clone()
    }

    /// Files passed to `prepare`, in order.
    pub fn prepared_files(&self) -> Vec<PathBuf> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AudioEvent::Prepared { file, .. } => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AudioEvent::Cue { cue, .. } => Some(cue),
                _ => None,
            })
            .collect()
    }

    /// Highest number of sessions that were prepared but not yet reset.
    pub fn max_concurrent_sessions(&self) -> usize {
        lock(&self.state).max_active
    }

    pub fn is_released(&self) -> bool {
        lock(&self.state).events.contains(&AudioEvent::Released)
    }

    fn current_listener(&self) -> Option<Arc<dyn PlaybackListener>> {
        lock(&self.state).listener.clone()
    }
}

impl AudioDevice for MockAudioDevice {
    fn prepare(
        &self,
        path: &Path,
        route: AudioRoute,
        listener: Arc<dyn PlaybackListener>,
    ) -> Result<(), TalkieError> {
        let mode = *lock(&self.mode);
        {
            let mut state = lock(&self.state);
            state.events.push(AudioEvent::Prepared {
                file: path.to_path_buf(),
                route,
            });
            if mode == AudioMode::RejectPrepare {
                return Err(TalkieError::playback("mock device rejected the file"));
            }
            state.active += 1;
            state.max_active = state.max_active.max(state.active);
            state.listener = Some(Arc::clone(&listener));
        }

        match mode {
            AudioMode::Complete => {
                std::thread::spawn(move || listener.on_prepared());
            }
            AudioMode::ErrorAfterPrepare => {
                std::thread::spawn(move || {
                    listener.on_error(TalkieError::playback("mock decoder error"))
                });
            }
            AudioMode::Hang | AudioMode::RejectPrepare => {}
        }
        Ok(())
    }

    fn start(&self) -> Result<(), TalkieError> {
        lock(&self.state).events.push(AudioEvent::Started);
        if let Some(listener) = self.current_listener() {
            let play_time = self.play_time;
            std::thread::spawn(move || {
                std::thread::sleep(play_time);
                listener.on_completion();
            });
        }
        Ok(())
    }

    fn play_cue(&self, cue: Cue, route: AudioRoute) {
        lock(&self.state).events.push(AudioEvent::Cue { cue, route });
    }

    fn reset(&self) {
        let mut state = lock(&self.state);
        state.events.push(AudioEvent::Reset);
        state.active = state.active.saturating_sub(1);
        state.listener = None;
    }

    fn release(&self) {
        let mut state = lock(&self.state);
        state.events.push(AudioEvent::Released);
        state.listener = None;
    }
}
