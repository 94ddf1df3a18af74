//! Transport selection

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::FrameTransport;
use crate::error::TransportError;
use crate::mock::{MockConfig, MockTransport};

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Raw SocketCAN (Linux only)
    SocketCan(SocketCanConfig),
    /// Mock transport for testing
    Mock(MockConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Mock(MockConfig::default())
    }
}

/// SocketCAN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketCanConfig {
    /// CAN interface name (e.g., "can0", "vcan0")
    pub interface: String,
    /// Open a CAN FD capable socket
    #[serde(default)]
    pub fd: bool,
}

/// Create a transport based on configuration
pub fn create_transport(config: &TransportConfig) -> Result<Arc<dyn FrameTransport>, TransportError> {
    match config {
        #[cfg(all(target_os = "linux", feature = "socketcan"))]
        TransportConfig::SocketCan(cfg) => {
            let transport = crate::socketcan::SocketCanTransport::new(cfg)?;
            Ok(Arc::new(transport))
        }
        #[cfg(not(all(target_os = "linux", feature = "socketcan")))]
        TransportConfig::SocketCan(_) => Err(TransportError::Unsupported(
            "SocketCAN requires Linux and the 'socketcan' feature".to_string(),
        )),
        TransportConfig::Mock(cfg) => Ok(Arc::new(MockTransport::new(cfg))),
    }
}
