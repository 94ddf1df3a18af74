//! Transport trait

use async_trait::async_trait;

use crate::error::TransportError;
use crate::frame::CanFrame;

/// Bus-agnostic interface for putting frames on the wire
///
/// A send is a short, non-cancellable write. Timing and arbitration are the
/// implementation's concern.
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Write one frame to the bus
    async fn send(&self, frame: &CanFrame) -> Result<(), TransportError>;

    /// Release the underlying bus handle
    ///
    /// Must be idempotent; later sends fail with `ConnectionClosed`.
    fn shutdown(&self);

    /// Check if the transport can still send
    fn is_connected(&self) -> bool;

    /// Short description used in logs (e.g. "socketcan:can0")
    fn describe(&self) -> String;
}
