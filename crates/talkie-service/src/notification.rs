// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unread-messages notification, derived from the mailbox and preferences.

use std::sync::Arc;

use tracing::debug;

use talkie_core::{
    Folder, MailboxStore, NotificationSink, PreferenceSource, TalkieError, UnreadNotification,
};

/// Decide what the notification should show for `count` unread messages.
///
/// Returns `None` when the notification should be cancelled: nothing is
/// unread, or autoplay will play the messages anyway.
pub fn evaluate(
    count: u64,
    alert: bool,
    preferences: &dyn PreferenceSource,
) -> Option<UnreadNotification> {
    if count == 0 || preferences.autoplay() {
        return None;
    }
    Some(UnreadNotification {
        count,
        alert,
        vibrate: alert && preferences.vibrate_on_message(),
        ringtone: preferences.ringtone_uri(),
    })
}

/// Keeps the single notification in sync with the Inbox.
pub struct NotificationPresenter {
    sink: Arc<dyn NotificationSink>,
    mailbox: Arc<dyn MailboxStore>,
    preferences: Arc<dyn PreferenceSource>,
}

impl NotificationPresenter {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        mailbox: Arc<dyn MailboxStore>,
        preferences: Arc<dyn PreferenceSource>,
    ) -> Self {
        Self {
            sink,
            mailbox,
            preferences,
        }
    }

    /// Re-evaluate the notification. `alert` is set after a receive.
    pub async fn refresh(&self, alert: bool) -> Result<(), TalkieError> {
        let count = self.mailbox.unread_count(Folder::Inbox).await?;
        match evaluate(count, alert, self.preferences.as_ref()) {
            Some(notification) => {
                debug!(count, alert, "posting unread notification");
                self.sink.notify(&notification)
            }
            None => {
                debug!(count, "cancelling unread notification");
                self.sink.cancel()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::SharedPreferences;
    use talkie_config::model::PreferencesConfig;

    fn prefs(autoplay: bool, vibrate: bool) -> SharedPreferences {
        SharedPreferences::new(&PreferencesConfig {
            autoplay,
            vibrate_on_message: vibrate,
            ringtone_uri: "content://ring".to_string(),
        })
    }

    #[test]
    fn nothing_unread_cancels() {
        assert_eq!(evaluate(0, true, &prefs(false, true)), None);
    }

    #[test]
    fn autoplay_suppresses_notification() {
        assert_eq!(evaluate(3, true, &prefs(true, true)), None);
    }

    #[test]
    fn alert_carries_vibrate_and_ringtone() {
        let n = evaluate(2, true, &prefs(false, true)).unwrap();
        assert_eq!(n.count, 2);
        assert!(n.alert);
        assert!(n.vibrate);
        assert_eq!(n.ringtone, "content://ring");
    }

    #[test]
    fn silent_update_does_not_vibrate() {
        let n = evaluate(1, false, &prefs(false, true)).unwrap();
        assert!(!n.alert);
        assert!(!n.vibrate);
    }

    #[test]
    fn vibrate_preference_off() {
        let n = evaluate(1, true, &prefs(false, false)).unwrap();
        assert!(!n.vibrate);
    }
}
