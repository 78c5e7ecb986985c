// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Talkie integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic tests
//! without a DTN daemon or audio hardware.
//!
//! # Components
//!
//! - [`MockNetworkClient`] / [`MockNetworkSession`] - scripted inbound bundles, captured sends
//! - [`MockAudioDevice`] - threaded playback callbacks with failure modes
//! - [`RecordingNotifications`] - captured notification posts and cancels
//! - [`TestHarness`] - a running service against a temp mailbox

pub mod harness;
pub mod mock_audio;
pub mod mock_network;
pub mod mock_notifications;

pub use harness::{eventually, TestHarness, TestHarnessBuilder};
pub use mock_audio::{AudioEvent, AudioMode, MockAudioDevice};
pub use mock_network::{
    MockNetworkClient, MockNetworkSession, NetworkMode, ScriptedBlock, ScriptedBundle, SentBundle,
};
pub use mock_notifications::{NotificationEvent, RecordingNotifications};
