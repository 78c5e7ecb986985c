// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System notification sink.

use crate::error::TalkieError;
use crate::types::UnreadNotification;

/// Posts and cancels the single "unread messages" notification.
pub trait NotificationSink: Send + Sync {
    /// Creates or replaces the notification.
    fn notify(&self, notification: &UnreadNotification) -> Result<(), TalkieError>;

    /// Removes the notification if it is shown.
    fn cancel(&self) -> Result<(), TalkieError>;
}
