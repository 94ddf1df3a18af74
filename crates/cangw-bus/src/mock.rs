//! Mock transport for testing and running without a bus

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::adapter::FrameTransport;
use crate::error::TransportError;
use crate::frame::CanFrame;

/// Mock transport configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    /// Simulated latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
}

/// Records every frame instead of writing it to a bus
pub struct MockTransport {
    config: MockConfig,
    connected: AtomicBool,
    shutdowns: AtomicUsize,
    sent: RwLock<Vec<CanFrame>>,
    /// When set, every send fails with this reason
    failure: RwLock<Option<String>>,
}

impl MockTransport {
    pub fn new(config: &MockConfig) -> Self {
        Self {
            config: config.clone(),
            connected: AtomicBool::new(true),
            shutdowns: AtomicUsize::new(0),
            sent: RwLock::new(Vec::new()),
            failure: RwLock::new(None),
        }
    }

    /// Frames sent so far, oldest first
    pub fn sent_frames(&self) -> Vec<CanFrame> {
        self.sent.read().clone()
    }

    pub fn last_frame(&self) -> Option<CanFrame> {
        self.sent.read().last().cloned()
    }

    pub fn clear(&self) {
        self.sent.write().clear();
    }

    /// Make subsequent sends fail (`Some`) or succeed again (`None`)
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.failure.write() = reason.map(str::to_string);
    }

    /// Number of times `shutdown` was called
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameTransport for MockTransport {
    async fn send(&self, frame: &CanFrame) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        if let Some(reason) = self.failure.read().clone() {
            return Err(TransportError::SendFailed(reason));
        }

        tracing::debug!(frame = %frame, "Mock transport send");
        self.sent.write().push(frame.clone());
        Ok(())
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
