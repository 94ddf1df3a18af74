//! Message and signal definition structures
//!
//! Represents the complete layout of a CAN frame: which signals it carries,
//! where their bits live, and how raw integers map to physical values.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{parse_frame_id, DbcError, DbcResult};
use crate::types::{ByteOrder, CLASSIC_MAX_LEN, FD_MAX_LEN};

/// Definition of a single signal inside a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDefinition {
    /// Canonical signal name
    pub name: String,

    /// Start bit (LSB for little endian, MSB for big endian)
    pub start_bit: usize,

    /// Length in bits (1..=64)
    pub length: usize,

    #[serde(default)]
    pub byte_order: ByteOrder,

    /// Two's complement raw value
    #[serde(default)]
    pub signed: bool,

    /// Scale factor: physical = raw * scale + offset
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Offset: physical = raw * scale + offset
    #[serde(default)]
    pub offset: f64,

    /// Minimum physical value (validated on encode)
    #[serde(default, alias = "min", skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Maximum physical value (validated on encode)
    #[serde(default, alias = "max", skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Initial physical value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<f64>,

    /// Unit string (e.g., "rpm", "%")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

fn default_scale() -> f64 {
    1.0
}

impl SignalDefinition {
    /// Create an unsigned little-endian signal with unit scale
    pub fn new(name: impl Into<String>, start_bit: usize, length: usize) -> Self {
        Self {
            name: name.into(),
            start_bit,
            length,
            byte_order: ByteOrder::LittleEndian,
            signed: false,
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            initial: None,
            unit: None,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Add scale/offset
    pub fn with_scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Add min/max bounds
    pub fn with_bounds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Mask covering `length` bits
    pub fn raw_mask(&self) -> u64 {
        if self.length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.length) - 1
        }
    }

    /// Inclusive raw value bounds representable by this signal
    pub fn raw_bounds(&self) -> (f64, f64) {
        let bits = self.length as i32;
        if self.signed {
            let half = 2f64.powi(bits - 1);
            (-half, half - 1.0)
        } else {
            (0.0, 2f64.powi(bits) - 1.0)
        }
    }

    /// Payload bit positions occupied by this signal, least significant bit first
    ///
    /// Position `p` addresses bit `p % 8` of byte `p / 8`.
    pub fn bit_positions(&self) -> Vec<usize> {
        match self.byte_order {
            ByteOrder::LittleEndian => (self.start_bit..self.start_bit + self.length).collect(),
            ByteOrder::BigEndian => {
                let mut positions = Vec::with_capacity(self.length);
                let mut pos = self.start_bit;
                for i in 0..self.length {
                    positions.push(pos);
                    if i + 1 == self.length {
                        break;
                    }
                    if pos % 8 == 0 {
                        pos += 15;
                    } else {
                        pos -= 1;
                    }
                }
                positions.reverse();
                positions
            }
        }
    }

    fn validate(&self) -> DbcResult<()> {
        let invalid = |reason: &str| DbcError::InvalidSignal {
            signal: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if self.length == 0 || self.length > 64 {
            return Err(invalid("length must be between 1 and 64 bits"));
        }
        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(invalid("scale must be a non-zero finite number"));
        }
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(invalid("minimum is greater than maximum"));
            }
        }
        Ok(())
    }
}

/// Definition of a CAN message (frame layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDefinition {
    /// Canonical message name
    pub name: String,

    /// Frame identifier (11-bit standard or 29-bit extended)
    #[serde(deserialize_with = "deserialize_frame_id")]
    pub frame_id: u32,

    /// 29-bit identifier
    #[serde(default)]
    pub extended: bool,

    /// CAN FD frame
    #[serde(default)]
    pub fd: bool,

    /// Payload length in bytes
    #[serde(default = "default_length")]
    pub length: usize,

    /// Signals in schema order
    #[serde(default)]
    pub signals: Vec<SignalDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_length() -> usize {
    CLASSIC_MAX_LEN
}

impl MessageDefinition {
    /// Create a classic 8-byte standard-id message
    pub fn new(name: impl Into<String>, frame_id: u32) -> Self {
        Self {
            name: name.into(),
            frame_id,
            extended: false,
            fd: false,
            length: CLASSIC_MAX_LEN,
            signals: Vec::new(),
            description: None,
        }
    }

    pub fn with_signal(mut self, signal: SignalDefinition) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn extended(mut self) -> Self {
        self.extended = true;
        self
    }

    pub fn fd(mut self) -> Self {
        self.fd = true;
        self
    }

    /// Look up a signal by exact canonical name
    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.name.as_str())
    }

    /// Check identifier range, payload length and signal layout
    pub fn validate(&self) -> DbcResult<()> {
        let invalid = |reason: String| DbcError::InvalidMessage {
            message: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name".to_string()));
        }
        let id_limit = if self.extended { 0x1FFF_FFFF } else { 0x7FF };
        if self.frame_id > id_limit {
            return Err(invalid(format!(
                "frame id 0x{:X} exceeds 0x{:X}",
                self.frame_id, id_limit
            )));
        }
        let max_len = if self.fd { FD_MAX_LEN } else { CLASSIC_MAX_LEN };
        if self.length > max_len {
            return Err(invalid(format!(
                "length {} exceeds {} bytes",
                self.length, max_len
            )));
        }

        let payload_bits = self.length * 8;
        for signal in &self.signals {
            signal.validate()?;
            if signal.bit_positions().iter().any(|&p| p >= payload_bits) {
                return Err(DbcError::LayoutOverflow {
                    message: self.name.clone(),
                    signal: signal.name.clone(),
                    length: self.length,
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameIdRepr {
    Number(u32),
    Text(String),
}

fn deserialize_frame_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match FrameIdRepr::deserialize(deserializer)? {
        FrameIdRepr::Number(id) => Ok(id),
        FrameIdRepr::Text(s) => parse_frame_id(&s).map_err(serde::de::Error::custom),
    }
}
