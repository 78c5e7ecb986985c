// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch and playback coordination for the Talkie voice-message service.
//!
//! [`TalkieService`] wires the collaborators together:
//! - the [`BundleReceiver`] turns inbound DTN transfers into spool files
//! - a single [`Dispatcher`] worker runs every [`Command`] in FIFO order
//! - the [`PlaybackCoordinator`] serializes the audio device
//! - the [`NotificationPresenter`] mirrors the unread Inbox count
//! - the [`ProximityMonitor`] picks earpiece or speaker

pub mod command;
pub mod dispatch;
pub mod notification;
pub mod playback;
pub mod preferences;
pub mod proximity;
pub mod receive;
pub mod service;

pub use command::{command_channel, Command, CommandSender};
pub use dispatch::Dispatcher;
pub use notification::NotificationPresenter;
pub use playback::{PlaybackCoordinator, PlaybackOutcome};
pub use preferences::SharedPreferences;
pub use proximity::ProximityMonitor;
pub use receive::{BundleReceiver, InboundTransfer, TransferState};
pub use service::{ServiceDeps, TalkieHandle, TalkieService};
