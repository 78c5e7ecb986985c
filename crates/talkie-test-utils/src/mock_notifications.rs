// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink that records every post and cancel.

use std::sync::{Mutex, PoisonError};

use talkie_core::{NotificationSink, TalkieError, UnreadNotification};

/// One call made to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Notify(UnreadNotification),
    Cancel,
}

#[derive(Default)]
pub struct RecordingNotifications {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The notification as a user would see it now.
    pub fn current(&self) -> Option<UnreadNotification> {
        match self.events().last() {
            Some(NotificationEvent::Notify(n)) => Some(n.clone()),
            _ => None,
        }
    }

    /// Whether the notification was ever posted.
    pub fn ever_shown(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, NotificationEvent::Notify(_)))
    }

    fn record(&self, event: NotificationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl NotificationSink for RecordingNotifications {
    fn notify(&self, notification: &UnreadNotification) -> Result<(), TalkieError> {
        self.record(NotificationEvent::Notify(notification.clone()));
        Ok(())
    }

    fn cancel(&self) -> Result<(), TalkieError> {
        self.record(NotificationEvent::Cancel);
        Ok(())
    }
}
