//! Core types for signal layouts

use serde::{Deserialize, Serialize};

/// Bit numbering / byte order of a signal within the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// Intel layout: `start_bit` is the least significant bit
    #[default]
    #[serde(alias = "intel", alias = "little")]
    LittleEndian,
    /// Motorola layout: `start_bit` is the most significant bit (DBC sawtooth numbering)
    #[serde(alias = "motorola", alias = "big")]
    BigEndian,
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ByteOrder::LittleEndian => "little_endian",
            ByteOrder::BigEndian => "big_endian",
        };
        f.write_str(s)
    }
}

/// Maximum payload length of a classic CAN frame
pub const CLASSIC_MAX_LEN: usize = 8;

/// Maximum payload length of a CAN FD frame
pub const FD_MAX_LEN: usize = 64;
