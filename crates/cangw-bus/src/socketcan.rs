//! SocketCAN transport writing raw CAN / CAN FD frames (Linux only)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use socketcan::{
    CanFdFrame, CanFdSocket, CanFrame as RawFrame, CanSocket, EmbeddedFrame, ExtendedId, Id,
    Socket, StandardId,
};

use crate::adapter::FrameTransport;
use crate::config::SocketCanConfig;
use crate::error::TransportError;
use crate::frame::CanFrame;

enum RawSocket {
    Classic(CanSocket),
    Fd(CanFdSocket),
}

/// Raw SocketCAN transport bound to one interface
pub struct SocketCanTransport {
    interface: String,
    socket: Arc<Mutex<Option<RawSocket>>>,
    connected: AtomicBool,
}

impl SocketCanTransport {
    pub fn new(config: &SocketCanConfig) -> Result<Self, TransportError> {
        let socket = if config.fd {
            CanFdSocket::open(&config.interface).map(RawSocket::Fd)
        } else {
            CanSocket::open(&config.interface).map(RawSocket::Classic)
        }
        .map_err(|e| {
            TransportError::ConnectionFailed(format!(
                "Failed to open CAN socket on {}: {}",
                config.interface, e
            ))
        })?;

        tracing::info!(interface = %config.interface, fd = config.fd, "SocketCAN transport opened");

        Ok(Self {
            interface: config.interface.clone(),
            socket: Arc::new(Mutex::new(Some(socket))),
            connected: AtomicBool::new(true),
        })
    }
}

fn raw_id(frame: &CanFrame) -> Result<Id, TransportError> {
    let id = if frame.is_extended() {
        ExtendedId::new(frame.id()).map(Id::Extended)
    } else {
        u16::try_from(frame.id())
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    };
    id.ok_or_else(|| TransportError::InvalidFrame(format!("Invalid CAN ID: 0x{:X}", frame.id())))
}

fn write(socket: &RawSocket, frame: &CanFrame) -> Result<(), TransportError> {
    let id = raw_id(frame)?;
    let result = match socket {
        RawSocket::Classic(sock) => {
            if frame.is_fd() {
                return Err(TransportError::InvalidFrame(
                    "CAN FD frame on a classic CAN socket".to_string(),
                ));
            }
            let raw = RawFrame::new(id, frame.data())
                .ok_or_else(|| TransportError::InvalidFrame(frame.to_string()))?;
            sock.write_frame(&raw)
        }
        RawSocket::Fd(sock) => {
            if frame.is_fd() {
                let raw = CanFdFrame::new(id, frame.data())
                    .ok_or_else(|| TransportError::InvalidFrame(frame.to_string()))?;
                sock.write_frame(&raw)
            } else {
                let raw = RawFrame::new(id, frame.data())
                    .ok_or_else(|| TransportError::InvalidFrame(frame.to_string()))?;
                sock.write_frame(&raw)
            }
        }
    };
    result.map_err(|e| TransportError::SendFailed(e.to_string()))
}

#[async_trait]
impl FrameTransport for SocketCanTransport {
    async fn send(&self, frame: &CanFrame) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let socket = self.socket.clone();
        let frame = frame.clone();
        tokio::task::spawn_blocking(move || {
            let guard = socket.lock();
            match guard.as_ref() {
                Some(sock) => write(sock, &frame),
                None => Err(TransportError::ConnectionClosed),
            }
        })
        .await
        .map_err(|e| TransportError::SendFailed(format!("Send task failed: {}", e)))?
    }

    fn shutdown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the socket closes the file descriptor
        if self.socket.lock().take().is_some() {
            tracing::info!(interface = %self.interface, "SocketCAN transport closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        format!("socketcan:{}", self.interface)
    }
}
