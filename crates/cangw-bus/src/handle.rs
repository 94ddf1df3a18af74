//! Ownership-tagged transport handle
//!
//! The gateway shuts a transport down on teardown only when it owns it. A
//! borrowed transport belongs to someone else and is left running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::FrameTransport;
use crate::error::TransportError;
use crate::frame::CanFrame;

/// Who is responsible for shutting the transport down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Created by the gateway; released on `close()` or drop
    Owned,
    /// Supplied by the caller; never shut down by the gateway
    Borrowed,
}

pub struct TransportHandle {
    transport: Arc<dyn FrameTransport>,
    ownership: Ownership,
    closed: AtomicBool,
}

impl TransportHandle {
    pub fn owned(transport: Arc<dyn FrameTransport>) -> Self {
        Self::new(transport, Ownership::Owned)
    }

    pub fn borrowed(transport: Arc<dyn FrameTransport>) -> Self {
        Self::new(transport, Ownership::Borrowed)
    }

    fn new(transport: Arc<dyn FrameTransport>, ownership: Ownership) -> Self {
        Self {
            transport,
            ownership,
            closed: AtomicBool::new(false),
        }
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a frame through the wrapped transport
    pub async fn send(&self, frame: &CanFrame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        self.transport.send(frame).await
    }

    /// Release the handle; shuts the transport down only if owned
    ///
    /// Safe to call more than once. Also runs on drop.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.ownership {
            Ownership::Owned => {
                tracing::info!(transport = %self.transport.describe(), "Shutting down owned transport");
                self.transport.shutdown();
            }
            Ownership::Borrowed => {
                tracing::debug!(transport = %self.transport.describe(), "Releasing borrowed transport");
            }
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("transport", &self.transport.describe())
            .field("ownership", &self.ownership)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConfig, MockTransport};

    fn frame() -> CanFrame {
        CanFrame::new(0x100, vec![1, 2], false, false).unwrap()
    }

    #[tokio::test]
    async fn test_owned_transport_shut_down_on_close() {
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        let handle = TransportHandle::owned(mock.clone());

        handle.send(&frame()).await.unwrap();
        handle.close();
        handle.close();

        assert_eq!(mock.shutdown_count(), 1);
        assert!(!mock.is_connected());
        assert_eq!(
            handle.send(&frame()).await,
            Err(TransportError::ConnectionClosed)
        );
    }

    #[tokio::test]
    async fn test_owned_transport_shut_down_on_drop() {
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        {
            let _handle = TransportHandle::owned(mock.clone());
        }
        assert_eq!(mock.shutdown_count(), 1);
    }

    #[tokio::test]
    async fn test_borrowed_transport_left_running() {
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        {
            let handle = TransportHandle::borrowed(mock.clone());
            handle.send(&frame()).await.unwrap();
            handle.close();
        }
        assert_eq!(mock.shutdown_count(), 0);
        assert!(mock.is_connected());
        assert_eq!(mock.sent_frames().len(), 1);
    }
}
