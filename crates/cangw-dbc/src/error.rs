//! Error types for the signal database and frame codec

use thiserror::Error;

/// Errors that can occur while loading a database or encoding/decoding frames
#[derive(Debug, Error)]
pub enum DbcError {
    /// Message not found in the database
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// Invalid frame identifier format or value
    #[error("invalid frame id: {0}")]
    InvalidFrameId(String),

    /// Message definition is not usable
    #[error("invalid message '{message}': {reason}")]
    InvalidMessage { message: String, reason: String },

    /// Signal definition is not usable
    #[error("invalid signal '{signal}': {reason}")]
    InvalidSignal { signal: String, reason: String },

    /// Signal bits fall outside the message payload
    #[error("signal '{signal}' does not fit in message '{message}' ({length} bytes)")]
    LayoutOverflow {
        message: String,
        signal: String,
        length: usize,
    },

    /// No value supplied for a signal of the message being encoded
    #[error("missing value for signal '{0}'")]
    MissingSignal(String),

    /// Value is not a finite number
    #[error("invalid value for signal '{signal}': {value}")]
    InvalidValue { signal: String, value: f64 },

    /// Value out of range for encoding
    #[error("value {value} for signal '{signal}' not in [{min}, {max}]")]
    ValueOutOfRange {
        signal: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Data too short for the message layout
    #[error("data too short: expected {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },

    /// YAML/JSON parsing error
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for database and codec operations
pub type DbcResult<T> = Result<T, DbcError>;

/// Parse a frame identifier string
///
/// Accepts formats: "0x1A0", "0X1A0" (hex) and "416" (decimal)
pub fn parse_frame_id(s: &str) -> DbcResult<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|_| DbcError::InvalidFrameId(s.to_string()))
}

/// Format a frame identifier as uppercase hex with `0x` prefix
pub fn format_frame_id(frame_id: u32) -> String {
    format!("0x{:X}", frame_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_id() {
        assert_eq!(parse_frame_id("0x1A0").unwrap(), 0x1A0);
        assert_eq!(parse_frame_id("0X1a0").unwrap(), 0x1A0);
        assert_eq!(parse_frame_id("416").unwrap(), 416);
        assert_eq!(parse_frame_id("  0x18FF0001 ").unwrap(), 0x18FF_0001);
        assert!(parse_frame_id("engine").is_err());
        assert!(parse_frame_id("0x1FFFFFFFF").is_err());
    }

    #[test]
    fn test_format_frame_id() {
        assert_eq!(format_frame_id(0x1A0), "0x1A0");
        assert_eq!(format_frame_id(0x18FF_0001), "0x18FF0001");
    }
}
