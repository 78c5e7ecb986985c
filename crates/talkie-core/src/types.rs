// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the mailbox store, the network bridge, and the
//! playback pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TalkieError;

/// Seconds between the Unix epoch and the DTN epoch (2000-01-01T00:00:00Z).
pub const DTN_EPOCH_OFFSET: i64 = 946_684_800;

/// Latest DTN timestamp that converts to a four-digit year (9999-12-31T23:59:59Z).
pub const MAX_DTN_TIME: u64 = 252_455_615_999;

/// Block type of the bundle payload block.
pub const PAYLOAD_BLOCK_TYPE: u8 = 1;

/// Lifetime in seconds attached to every outbound recording.
pub const OUTBOUND_LIFETIME_SECS: u64 = 1800;

/// Store-assigned identifier of a mailbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox folder. A message never moves between folders.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Folder {
    Inbox,
    Outbox,
}

impl Folder {
    /// Stable name used as the folder column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Inbox => "inbox",
            Folder::Outbox => "outbox",
        }
    }
}

/// A DTN endpoint identifier such as `dtn://node1/dtalkie` or `ipn:12.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint(String);

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Endpoint {
    type Err = TalkieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = if let Some(rest) = s.strip_prefix("dtn:") {
            !rest.is_empty()
        } else if let Some(rest) = s.strip_prefix("ipn:") {
            match rest.split_once('.') {
                Some((node, service)) => {
                    node.parse::<u64>().is_ok() && service.parse::<u64>().is_ok()
                }
                None => false,
            }
        } else {
            false
        };

        if valid {
            Ok(Endpoint(s.to_string()))
        } else {
            Err(TalkieError::InvalidEndpoint(s.to_string()))
        }
    }
}

impl TryFrom<String> for Endpoint {
    type Error = TalkieError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(value: Endpoint) -> Self {
        value.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert a DTN timestamp (seconds since 2000-01-01) to wall-clock time.
///
/// Timestamps past [`MAX_DTN_TIME`] clamp to the end of year 9999.
pub fn dtn_time_to_utc(dtn_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(dtn_secs.min(MAX_DTN_TIME)).unwrap_or_default();
    Utc.timestamp_opt(DTN_EPOCH_OFFSET + secs, 0)
        .single()
        .unwrap_or_default()
}

/// Convert wall-clock time to a DTN timestamp. Times before the DTN epoch clamp to 0.
pub fn utc_to_dtn_time(time: DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp() - DTN_EPOCH_OFFSET).unwrap_or(0)
}

/// Identity of a bundle as known to the DTN daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId {
    pub source: Endpoint,
    /// Creation timestamp in DTN seconds.
    pub timestamp: u64,
    pub sequence: u64,
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}.{}] {}", self.timestamp, self.sequence, self.source)
    }
}

/// Metadata announced by the network layer when an inbound transfer starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMeta {
    pub id: BundleId,
    pub destination: Endpoint,
}

impl BundleMeta {
    pub fn source(&self) -> &Endpoint {
        &self.id.source
    }

    /// Sender-asserted creation time.
    pub fn created(&self) -> DateTime<Utc> {
        dtn_time_to_utc(self.id.timestamp)
    }
}

/// Describes one block of an inbound bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub block_type: u8,
    pub length: u64,
}

impl BlockDescriptor {
    pub fn is_payload(&self) -> bool {
        self.block_type == PAYLOAD_BLOCK_TYPE
    }
}

/// How the network layer should deliver the bytes of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Write the block into the sink returned by `payload_sink()`.
    StreamToFile,
    /// Deliver nothing special; bytes, if any, are passed to `on_block_bytes`.
    Ignore,
}

/// Registration the service presents to the DTN daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Application endpoint name, e.g. `dtalkie`.
    pub endpoint: String,
    /// Group endpoints the application subscribes to.
    pub groups: Vec<Endpoint>,
}

/// A message as stored in the mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub folder: Folder,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub created: DateTime<Utc>,
    pub received: DateTime<Utc>,
    pub file: PathBuf,
    pub read: bool,
}

/// Attributes of a message about to be inserted. New messages are unread.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub created: DateTime<Utc>,
    pub received: DateTime<Utc>,
    pub file: PathBuf,
}

/// A mutation broadcast by the mailbox store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailboxChange {
    Inserted { folder: Folder, id: MessageId },
    Marked { folder: Folder, id: MessageId, read: bool },
    Removed { folder: Folder, id: MessageId },
}

/// Logical audio stream used for cue tones and playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AudioRoute {
    /// Voice-call stream, used while the device is held to the ear.
    Earpiece,
    /// Loud speaker / music stream.
    Speaker,
}

/// Short sound effects played around message playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Cue {
    Beep,
    Confirm,
}

/// The single persistent "unread messages" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadNotification {
    pub count: u64,
    /// True when posted because of a newly received message.
    pub alert: bool,
    pub vibrate: bool,
    pub ringtone: String,
}

/// A preference value that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceChange {
    Autoplay(bool),
    VibrateOnMessage(bool),
    RingtoneUri(String),
}

/// Sticky outcome of the network registration performed at service start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[default]
    None,
    ServiceUnavailable,
    PermissionDenied,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Mailbox,
    Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_accepts_dtn_and_ipn_schemes() {
        assert!("dtn://node1/dtalkie".parse::<Endpoint>().is_ok());
        assert!("dtn:none".parse::<Endpoint>().is_ok());
        assert!("ipn:12.3".parse::<Endpoint>().is_ok());
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("http://node1".parse::<Endpoint>().is_err());
        assert!("dtn:".parse::<Endpoint>().is_err());
        assert!("ipn:12".parse::<Endpoint>().is_err());
        assert!("ipn:a.b".parse::<Endpoint>().is_err());
    }

    #[test]
    fn endpoint_serializes_as_plain_string() {
        let ep: Endpoint = "dtn://node2/dtalkie".parse().unwrap();
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, "\"dtn://node2/dtalkie\"");
        let bad: Result<Endpoint, _> = serde_json::from_str("\"mailto:x\"");
        assert!(bad.is_err());
    }

    #[test]
    fn dtn_epoch_maps_to_year_2000() {
        let t = dtn_time_to_utc(0);
        assert_eq!(t.to_rfc3339(), "2000-01-01T00:00:00+00:00");
        assert_eq!(utc_to_dtn_time(t), 0);
        assert_eq!(utc_to_dtn_time(dtn_time_to_utc(86_400)), 86_400);
    }

    #[test]
    fn far_future_times_clamp_to_year_9999() {
        let last = dtn_time_to_utc(MAX_DTN_TIME);
        assert_eq!(last.to_rfc3339(), "9999-12-31T23:59:59+00:00");
        assert_eq!(dtn_time_to_utc(MAX_DTN_TIME + 1), last);
        assert_eq!(dtn_time_to_utc(u64::MAX), last);
        assert_eq!(utc_to_dtn_time(last), MAX_DTN_TIME);
    }

    #[test]
    fn pre_epoch_times_clamp_to_zero() {
        let t = Utc.timestamp_opt(0, 0).single().unwrap();
        assert_eq!(utc_to_dtn_time(t), 0);
    }

    #[test]
    fn folder_parses_case_insensitively() {
        assert_eq!("inbox".parse::<Folder>().unwrap(), Folder::Inbox);
        assert_eq!("OUTBOX".parse::<Folder>().unwrap(), Folder::Outbox);
        assert_eq!(Folder::Inbox.to_string(), "inbox");
    }

    #[test]
    fn only_type_one_is_payload() {
        let payload = BlockDescriptor { block_type: 1, length: 10 };
        let other = BlockDescriptor { block_type: 8, length: 10 };
        assert!(payload.is_payload());
        assert!(!other.is_payload());
    }
}
