// SPDX-FileCopyrightText: 2026 Talkie Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock DTN client and session.
//!
//! `MockNetworkSession` replays scripted inbound bundles through the real
//! transfer callbacks and captures outbound sends and delivery acks.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use talkie_core::{
    AdapterType, BlockDescriptor, BundleId, BundleMeta, Endpoint, HealthStatus, NetworkClient,
    NetworkSession, PluginAdapter, Registration, TalkieError, TransferFactory, TransferMode,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One block of a scripted bundle.
#[derive(Debug, Clone)]
pub struct ScriptedBlock {
    pub block_type: u8,
    pub data: Vec<u8>,
}

/// An inbound bundle the mock session will deliver.
#[derive(Debug, Clone)]
pub struct ScriptedBundle {
    pub meta: BundleMeta,
    pub blocks: Vec<ScriptedBlock>,
    /// Drop the transfer after this many blocks instead of ending it.
    pub abort_after: Option<usize>,
}

impl ScriptedBundle {
    /// A bundle with a single payload block.
    pub fn voice(source: &str, destination: &str, created_dtn: u64, payload: &[u8]) -> Self {
        Self::new(source, destination, created_dtn).with_block(1, payload)
    }

    pub fn new(source: &str, destination: &str, created_dtn: u64) -> Self {
        Self {
            meta: BundleMeta {
                id: BundleId {
                    source: parse_endpoint(source),
                    timestamp: created_dtn,
                    sequence: 0,
                },
                destination: parse_endpoint(destination),
            },
            blocks: Vec::new(),
            abort_after: None,
        }
    }

    pub fn with_block(mut self, block_type: u8, data: &[u8]) -> Self {
        self.blocks.push(ScriptedBlock {
            block_type,
            data: data.to_vec(),
        });
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.meta.id.sequence = sequence;
        self
    }

    pub fn aborted_after(mut self, blocks: usize) -> Self {
        self.abort_after = Some(blocks);
        self
    }
}

fn parse_endpoint(s: &str) -> Endpoint {
    match s.parse() {
        Ok(endpoint) => endpoint,
        Err(e) => panic!("invalid endpoint in test script: {e}"),
    }
}

/// A captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBundle {
    pub destination: Endpoint,
    pub lifetime_secs: u64,
    pub payload: Vec<u8>,
}

/// Mock DTN session.
#[derive(Default)]
pub struct MockNetworkSession {
    inbound: Mutex<VecDeque<ScriptedBundle>>,
    sent: Mutex<Vec<SentBundle>>,
    delivered: Mutex<Vec<BundleId>>,
    fail_sends: Mutex<bool>,
    terminated: Mutex<bool>,
}

impl MockNetworkSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a bundle for the next `query_next`.
    pub fn inject(&self, bundle: ScriptedBundle) {
        lock(&self.inbound).push_back(bundle);
    }

    pub fn set_fail_sends(&self, fail: bool) {
        *lock(&self.fail_sends) = fail;
    }

    pub fn sent(&self) -> Vec<SentBundle> {
        lock(&self.sent).clone()
    }

    pub fn delivered(&self) -> Vec<BundleId> {
        lock(&self.delivered).clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.inbound).len()
    }

    pub fn is_terminated(&self) -> bool {
        *lock(&self.terminated)
    }

    /// Drive `factory` through the callbacks of one bundle.
    fn replay(bundle: ScriptedBundle, factory: &dyn TransferFactory) -> Result<(), TalkieError> {
        let mut handler = factory.on_transfer_start(bundle.meta.clone());
        let total: u64 = bundle.blocks.iter().map(|b| b.data.len() as u64).sum();
        let mut current = 0u64;

        for (index, block) in bundle.blocks.iter().enumerate() {
            if bundle.abort_after == Some(index) {
                drop(handler);
                return Ok(());
            }
            let descriptor = BlockDescriptor {
                block_type: block.block_type,
                length: block.data.len() as u64,
            };
            match handler.on_block_start(&descriptor) {
                TransferMode::StreamToFile => match handler.payload_sink() {
                    Some(sink) => sink.write_all(&block.data)?,
                    None => {
                        return Err(TalkieError::Internal(
                            "stream-to-file without a sink".to_string(),
                        ))
                    }
                },
                TransferMode::Ignore => handler.on_block_bytes(&block.data),
            }
            current += block.data.len() as u64;
            handler.on_progress(current, total);
            if bundle.abort_after == Some(index + 1) {
                // Abort with the block still open.
                drop(handler);
                return Ok(());
            }
            handler.on_block_end();
        }

        handler.on_transfer_end();
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockNetworkSession {
    fn name(&self) -> &str {
        "mock-network"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Network
    }

    async fn health_check(&self) -> Result<HealthStatus, TalkieError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TalkieError> {
        self.terminate().await
    }
}

#[async_trait]
impl NetworkSession for MockNetworkSession {
    async fn query_next(&self, receiver: &dyn TransferFactory) -> Result<bool, TalkieError> {
        let next = lock(&self.inbound).pop_front();
        match next {
            Some(bundle) => {
                Self::replay(bundle, receiver)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn send(
        &self,
        destination: &Endpoint,
        lifetime_secs: u64,
        mut payload: File,
    ) -> Result<BundleId, TalkieError> {
        if *lock(&self.fail_sends) {
            return Err(TalkieError::network("mock send failure"));
        }
        let mut bytes = Vec::new();
        payload.read_to_end(&mut bytes)?;

        let mut sent = lock(&self.sent);
        sent.push(SentBundle {
            destination: destination.clone(),
            lifetime_secs,
            payload: bytes,
        });
        Ok(BundleId {
            source: parse_endpoint("dtn://local/dtalkie"),
            timestamp: 0,
            sequence: sent.len() as u64,
        })
    }

    async fn delivered(&self, id: &BundleId) -> Result<(), TalkieError> {
        lock(&self.delivered).push(id.clone());
        Ok(())
    }

    async fn terminate(&self) -> Result<(), TalkieError> {
        *lock(&self.terminated) = true;
        Ok(())
    }
}

/// How the mock client answers `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkMode {
    #[default]
    Available,
    Unavailable,
    Denied,
}

/// Mock DTN client handing out one shared [`MockNetworkSession`].
pub struct MockNetworkClient {
    session: Arc<MockNetworkSession>,
    mode: NetworkMode,
    registrations: Mutex<Vec<Registration>>,
}

impl MockNetworkClient {
    pub fn new(mode: NetworkMode) -> Self {
        Self {
            session: Arc::new(MockNetworkSession::new()),
            mode,
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn session(&self) -> Arc<MockNetworkSession> {
        Arc::clone(&self.session)
    }

    pub fn registrations(&self) -> Vec<Registration> {
        lock(&self.registrations).clone()
    }
}

#[async_trait]
impl NetworkClient for MockNetworkClient {
    async fn initialize(
        &self,
        registration: &Registration,
    ) -> Result<Arc<dyn NetworkSession>, TalkieError> {
        lock(&self.registrations).push(registration.clone());
        match self.mode {
            NetworkMode::Available => Ok(self.session.clone()),
            NetworkMode::Unavailable => Err(TalkieError::ServiceUnavailable),
            NetworkMode::Denied => Err(TalkieError::PermissionDenied),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;
    use talkie_core::TransferHandler;

    #[derive(Default)]
    struct Recorder {
        events: Arc<StdMutex<Vec<String>>>,
    }

    struct RecordingHandler {
        events: Arc<StdMutex<Vec<String>>>,
        sink: Vec<u8>,
    }

    impl TransferFactory for Recorder {
        fn on_transfer_start(&self, meta: BundleMeta) -> Box<dyn TransferHandler> {
            self.events.lock().unwrap().push(format!("start:{}", meta.id.sequence));
            Box::new(RecordingHandler {
                events: Arc::clone(&self.events),
                sink: Vec::new(),
            })
        }
    }

    impl TransferHandler for RecordingHandler {
        fn on_block_start(&mut self, block: &BlockDescriptor) -> TransferMode {
            self.events.lock().unwrap().push(format!("block:{}", block.block_type));
            if block.block_type == 1 {
                TransferMode::StreamToFile
            } else {
                TransferMode::Ignore
            }
        }

        fn payload_sink(&mut self) -> Option<&mut dyn Write> {
            Some(&mut self.sink)
        }

        fn on_block_bytes(&mut self, chunk: &[u8]) {
            self.events.lock().unwrap().push(format!("bytes:{}", chunk.len()));
        }

        fn on_block_end(&mut self) {
            self.events.lock().unwrap().push("end_block".into());
        }

        fn on_progress(&mut self, _current: u64, _total: u64) {}

        fn on_transfer_end(self: Box<Self>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("end:{}", String::from_utf8_lossy(&self.sink)));
        }
    }

    #[tokio::test]
    async fn query_next_replays_one_bundle_at_a_time() {
        let session = MockNetworkSession::new();
        session.inject(
            ScriptedBundle::new("dtn://a/x", "dtn://b/x", 1)
                .with_block(9, b"hdr")
                .with_block(1, b"hi")
                .with_sequence(7),
        );
        let recorder = Recorder::default();

        assert!(session.query_next(&recorder).await.unwrap());
        assert!(!session.query_next(&recorder).await.unwrap());
        assert_eq!(
            recorder.events.lock().unwrap().clone(),
            vec!["start:7", "block:9", "bytes:3", "end_block", "block:1", "end_block", "end:hi"]
        );
    }

    #[tokio::test]
    async fn send_captures_payload_or_fails() {
        let session = MockNetworkSession::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rec.3gp");
        std::fs::write(&path, b"rec").unwrap();
        let dest: Endpoint = "dtn://peer/dtalkie".parse().unwrap();

        session
            .send(&dest, 1800, File::open(&path).unwrap())
            .await
            .unwrap();
        assert_eq!(session.sent()[0].payload, b"rec");

        session.set_fail_sends(true);
        assert!(session.send(&dest, 1800, File::open(&path).unwrap()).await.is_err());
        assert_eq!(session.sent().len(), 1);
    }

    #[tokio::test]
    async fn client_modes_map_to_errors() {
        let reg = Registration {
            endpoint: "dtalkie".into(),
            groups: vec![],
        };
        assert!(MockNetworkClient::new(NetworkMode::Available).initialize(&reg).await.is_ok());
        assert!(matches!(
            MockNetworkClient::new(NetworkMode::Unavailable).initialize(&reg).await,
            Err(TalkieError::ServiceUnavailable)
        ));
        assert!(matches!(
            MockNetworkClient::new(NetworkMode::Denied).initialize(&reg).await,
            Err(TalkieError::PermissionDenied)
        ));
    }
}
