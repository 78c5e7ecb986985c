// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Proximity sensor state and the audio route derived from it.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use talkie_core::AudioRoute;

/// Tracks whether the device is held to the ear.
///
/// Readings are published by the sensor producer; the dispatch worker reads
/// the latest value when it picks a route. No debounce is applied.
#[derive(Debug)]
pub struct ProximityMonitor {
    near: AtomicBool,
}

impl ProximityMonitor {
    pub fn new() -> Self {
        Self {
            near: AtomicBool::new(false),
        }
    }

    /// Feed one sensor reading. A reading at the sensor's maximum range means far.
    pub fn on_reading(&self, value: f32, max_range: f32) {
        let near = value < max_range;
        if self.near.swap(near, Ordering::AcqRel) != near {
            debug!(near, value, max_range, "proximity changed");
        }
    }

    pub fn is_near(&self) -> bool {
        self.near.load(Ordering::Acquire)
    }

    /// Earpiece while near, speaker otherwise.
    pub fn route(&self) -> AudioRoute {
        if self.is_near() {
            AudioRoute::Earpiece
        } else {
            AudioRoute::Speaker
        }
    }
}

impl Default for ProximityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
