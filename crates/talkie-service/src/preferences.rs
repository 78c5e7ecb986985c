// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process preference store and the autoplay listener task.

use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use talkie_config::model::PreferencesConfig;
use talkie_core::{PreferenceChange, PreferenceSource};

use crate::command::{Command, CommandSender};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct Values {
    autoplay: bool,
    vibrate_on_message: bool,
    ringtone_uri: String,
}

/// Preferences seeded from configuration and changeable at runtime.
#[derive(Debug)]
pub struct SharedPreferences {
    values: RwLock<Values>,
    changes: broadcast::Sender<PreferenceChange>,
}

impl SharedPreferences {
    pub fn new(config: &PreferencesConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: RwLock::new(Values {
                autoplay: config.autoplay,
                vibrate_on_message: config.vibrate_on_message,
                ringtone_uri: config.ringtone_uri.clone(),
            }),
            changes,
        }
    }

    fn read(&self) -> Values {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `update` and broadcast `change` if the stored value differs.
    fn update(&self, change: PreferenceChange, update: impl FnOnce(&mut Values) -> bool) {
        let changed = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            update(&mut values)
        };
        if changed {
            debug!(?change, "preference changed");
            let _ = self.changes.send(change);
        }
    }

    pub fn set_autoplay(&self, enabled: bool) {
        self.update(PreferenceChange::Autoplay(enabled), |v| {
            std::mem::replace(&mut v.autoplay, enabled) != enabled
        });
    }

    pub fn set_vibrate_on_message(&self, enabled: bool) {
        self.update(PreferenceChange::VibrateOnMessage(enabled), |v| {
            std::mem::replace(&mut v.vibrate_on_message, enabled) != enabled
        });
    }

    pub fn set_ringtone_uri(&self, uri: impl Into<String>) {
        let uri = uri.into();
        let new = uri.clone();
        self.update(PreferenceChange::RingtoneUri(uri), move |v| {
            std::mem::replace(&mut v.ringtone_uri, new.clone()) != new
        });
    }
}

impl PreferenceSource for SharedPreferences {
    fn autoplay(&self) -> bool {
        self.read().autoplay
    }

    fn vibrate_on_message(&self) -> bool {
        self.read().vibrate_on_message
    }

    fn ringtone_uri(&self) -> String {
        self.read().ringtone_uri
    }

    fn subscribe(&self) -> broadcast::Receiver<PreferenceChange> {
        self.changes.subscribe()
    }
}

/// Forward autoplay changes to the command queue until cancelled.
pub fn spawn_autoplay_listener(
    mut changes: broadcast::Receiver<PreferenceChange>,
    commands: CommandSender,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                change = changes.recv() => match change {
                    Ok(PreferenceChange::Autoplay(enabled)) => {
                        info!(enabled, "autoplay preference changed");
                        if !commands.send(Command::AutoplayChanged(enabled)) {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "preference listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("preference listener stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_channel;

    fn defaults() -> SharedPreferences {
        SharedPreferences::new(&PreferencesConfig::default())
    }

    #[test]
    fn seeded_from_config() {
        let prefs = defaults();
        assert!(!prefs.autoplay());
        assert!(prefs.vibrate_on_message());
        assert_eq!(
            prefs.ringtone_uri(),
            talkie_config::model::DEFAULT_RINGTONE_URI
        );
    }

    #[test]
    fn only_real_changes_are_broadcast() {
        let prefs = defaults();
        let mut rx = prefs.subscribe();

        prefs.set_autoplay(false);
        prefs.set_autoplay(true);
        prefs.set_ringtone_uri("content://ring");
        prefs.set_ringtone_uri("content://ring");

        assert_eq!(rx.try_recv().unwrap(), PreferenceChange::Autoplay(true));
        assert_eq!(
            rx.try_recv().unwrap(),
            PreferenceChange::RingtoneUri("content://ring".to_string())
        );
        assert!(rx.try_recv().is_err());
        assert!(prefs.autoplay());
    }

    #[tokio::test]
    async fn listener_maps_autoplay_to_commands() {
        let prefs = defaults();
        let (tx, mut rx) = command_channel();
        let cancel = CancellationToken::new();
        let handle = spawn_autoplay_listener(prefs.subscribe(), tx, cancel.clone());

        prefs.set_vibrate_on_message(false);
        prefs.set_autoplay(true);

        assert_eq!(rx.recv().await.unwrap(), Command::AutoplayChanged(true));
        cancel.cancel();
        handle.await.unwrap();
    }
}
