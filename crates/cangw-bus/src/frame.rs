//! CAN frame as handed to a transport

use std::fmt;

use crate::error::TransportError;

/// Largest 11-bit identifier
pub const MAX_STANDARD_ID: u32 = 0x7FF;
/// Largest 29-bit identifier
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

const CLASSIC_MAX_DLEN: usize = 8;
const FD_MAX_DLEN: usize = 64;

/// A data frame: identifier, payload and format flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    data: Vec<u8>,
    extended: bool,
    fd: bool,
}

impl CanFrame {
    /// Create a frame, checking the identifier range and payload length
    pub fn new(id: u32, data: Vec<u8>, extended: bool, fd: bool) -> Result<Self, TransportError> {
        let id_limit = if extended { MAX_EXTENDED_ID } else { MAX_STANDARD_ID };
        if id > id_limit {
            return Err(TransportError::InvalidFrame(format!(
                "identifier 0x{:X} exceeds 0x{:X}",
                id, id_limit
            )));
        }
        let max_len = if fd { FD_MAX_DLEN } else { CLASSIC_MAX_DLEN };
        if data.len() > max_len {
            return Err(TransportError::InvalidFrame(format!(
                "payload of {} bytes exceeds {} bytes",
                data.len(),
                max_len
            )));
        }
        Ok(Self {
            id,
            data,
            extended,
            fd,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn is_fd(&self) -> bool {
        self.fd
    }
}

impl fmt::Display for CanFrame {
    /// candump-like rendering: `1A0#0102`, `18FF0001#..` for extended, `##` for FD
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.fd { "##" } else { "#" };
        if self.extended {
            write!(f, "{:08X}{}{}", self.id, sep, hex::encode_upper(&self.data))
        } else {
            write!(f, "{:03X}{}{}", self.id, sep, hex::encode_upper(&self.data))
        }
    }
}
