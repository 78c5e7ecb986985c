// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audio output device trait.

use std::path::Path;
use std::sync::Arc;

use crate::error::TalkieError;
use crate::types::{AudioRoute, Cue};

/// Receives asynchronous device events on the device's own callback thread.
pub trait PlaybackListener: Send + Sync {
    /// The file is ready; rendering has not started yet.
    fn on_prepared(&self);

    /// Rendering finished.
    fn on_completion(&self);

    /// Preparing or rendering failed.
    fn on_error(&self, error: TalkieError);
}

/// The single physical audio output.
///
/// Methods return immediately; progress is reported through the
/// [`PlaybackListener`] given to [`AudioDevice::prepare`].
pub trait AudioDevice: Send + Sync {
    /// Starts preparing `path` for rendering on `route`.
    fn prepare(
        &self,
        path: &Path,
        route: AudioRoute,
        listener: Arc<dyn PlaybackListener>,
    ) -> Result<(), TalkieError>;

    /// Starts rendering a prepared file.
    fn start(&self) -> Result<(), TalkieError>;

    /// Plays a short sound effect.
    fn play_cue(&self, cue: Cue, route: AudioRoute);

    /// Returns the device to idle, dropping any prepared source.
    fn reset(&self);

    /// Releases the device for good.
    fn release(&self);
}
