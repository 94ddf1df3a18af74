//! cangw-bus - CAN frame transports
//!
//! Provides the [`FrameTransport`] trait the gateway writes frames through,
//! a SocketCAN implementation (Linux only), a mock for tests and an
//! ownership-tagged [`TransportHandle`].
//!
//! # Example
//!
//! ```ignore
//! use cangw_bus::{create_transport, CanFrame, TransportConfig, TransportHandle};
//!
//! let transport = create_transport(&TransportConfig::default())?;
//! let handle = TransportHandle::owned(transport);
//! handle.send(&CanFrame::new(0x1A0, vec![0x01, 0x02], false, false)?).await?;
//! handle.close();
//! ```

mod adapter;
pub mod config;
pub mod error;
pub mod frame;
pub mod handle;
pub mod mock;

#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

pub use adapter::FrameTransport;
pub use config::{create_transport, SocketCanConfig, TransportConfig};
pub use error::TransportError;
pub use frame::CanFrame;
pub use handle::{Ownership, TransportHandle};
pub use mock::{MockConfig, MockTransport};
