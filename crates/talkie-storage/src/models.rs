// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for stored mailbox entries.
//!
//! The canonical types are defined in `talkie-core::types` for use across
//! trait boundaries. This module re-exports them for convenience within the
//! storage crate.

pub use talkie_core::types::{Folder, MailboxChange, Message, MessageId, NewMessage};
