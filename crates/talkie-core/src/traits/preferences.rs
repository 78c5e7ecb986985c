// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User preference source.

use tokio::sync::broadcast;

use crate::types::PreferenceChange;

/// Key-value user preferences with change notification.
pub trait PreferenceSource: Send + Sync {
    /// Play newly received messages automatically.
    fn autoplay(&self) -> bool;

    /// Vibrate when a new message notification is posted.
    fn vibrate_on_message(&self) -> bool;

    /// Sound played when a new message notification is posted.
    fn ringtone_uri(&self) -> String;

    fn subscribe(&self) -> broadcast::Receiver<PreferenceChange>;
}
