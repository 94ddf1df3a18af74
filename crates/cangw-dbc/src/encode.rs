//! Encoding physical signal values to frame payloads
//!
//! Converts physical values to raw integers (reverse scale/offset), validates
//! them against the signal's bounds and packs them into the payload bits.
//!
//! [`encode_message`] enforces the declared `minimum`/`maximum`;
//! [`encode_message_unbounded`] only requires each value to fit its bits.

use std::collections::HashMap;

use crate::definition::{MessageDefinition, SignalDefinition};
use crate::error::{DbcError, DbcResult};

/// Encode a complete payload for a message
///
/// Every signal of the message must have a value in `values`, keyed by its
/// canonical name. Values for names the message does not define are ignored.
pub fn encode_message(def: &MessageDefinition, values: &HashMap<String, f64>) -> DbcResult<Vec<u8>> {
    encode_with(def, values, true)
}

/// Encode a complete payload without the declared physical bounds
///
/// Values must still be finite and fit the signal's bit width.
pub fn encode_message_unbounded(
    def: &MessageDefinition,
    values: &HashMap<String, f64>,
) -> DbcResult<Vec<u8>> {
    encode_with(def, values, false)
}

fn encode_with(
    def: &MessageDefinition,
    values: &HashMap<String, f64>,
    declared_bounds: bool,
) -> DbcResult<Vec<u8>> {
    let mut data = vec![0u8; def.length];

    for signal in &def.signals {
        let physical = values
            .get(&signal.name)
            .copied()
            .ok_or_else(|| DbcError::MissingSignal(signal.name.clone()))?;
        let raw = if declared_bounds {
            to_raw(signal, physical)?
        } else {
            bits_for(signal, physical)?
        };
        pack(&mut data, signal, raw);
    }

    Ok(data)
}

/// Convert a physical value to the raw bit pattern of a signal
pub fn to_raw(signal: &SignalDefinition, physical: f64) -> DbcResult<u64> {
    let min = signal.minimum.unwrap_or(f64::NEG_INFINITY);
    let max = signal.maximum.unwrap_or(f64::INFINITY);
    if physical < min || physical > max {
        return Err(DbcError::ValueOutOfRange {
            signal: signal.name.clone(),
            value: physical,
            min,
            max,
        });
    }
    bits_for(signal, physical)
}

/// Raw bit pattern of a finite physical value that fits the signal width
fn bits_for(signal: &SignalDefinition, physical: f64) -> DbcResult<u64> {
    if !physical.is_finite() {
        return Err(DbcError::InvalidValue {
            signal: signal.name.clone(),
            value: physical,
        });
    }

    // Reverse the scale/offset: raw = (physical - offset) / scale
    let raw = ((physical - signal.offset) / signal.scale).round();

    // Validate that the raw value fits the bit width
    let (raw_min, raw_max) = signal.raw_bounds();
    if raw < raw_min || raw > raw_max {
        let a = raw_min * signal.scale + signal.offset;
        let b = raw_max * signal.scale + signal.offset;
        return Err(DbcError::ValueOutOfRange {
            signal: signal.name.clone(),
            value: physical,
            min: a.min(b),
            max: a.max(b),
        });
    }

    let bits = if signal.signed {
        (raw as i64) as u64
    } else {
        raw as u64
    };
    Ok(bits & signal.raw_mask())
}

/// Write a raw value into the payload bits occupied by a signal
fn pack(data: &mut [u8], signal: &SignalDefinition, raw: u64) {
    for (i, pos) in signal.bit_positions().into_iter().enumerate() {
        let byte = pos / 8;
        let mask = 1u8 << (pos % 8);
        if (raw >> i) & 1 == 1 {
            data[byte] |= mask;
        } else {
            data[byte] &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ByteOrder;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_encode_little_endian_bytes() {
        let msg = MessageDefinition::new("M", 0x100)
            .with_signal(SignalDefinition::new("A", 0, 8))
            .with_signal(SignalDefinition::new("B", 8, 8));

        let data = encode_message(&msg, &values(&[("A", 5.0), ("B", 9.0)])).unwrap();
        assert_eq!(data, vec![5, 9, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_scaled_16_bit() {
        // 1800 rpm / 0.25 = 7200 = 0x1C20, Intel byte order
        let msg = MessageDefinition::new("Engine", 0x0C0)
            .with_length(2)
            .with_signal(SignalDefinition::new("RPM", 0, 16).with_scale(0.25, 0.0));

        let data = encode_message(&msg, &values(&[("RPM", 1800.0)])).unwrap();
        assert_eq!(data, vec![0x20, 0x1C]);
    }

    #[test]
    fn test_encode_big_endian() {
        let msg = MessageDefinition::new("Motorola", 0x200)
            .with_length(2)
            .with_signal(SignalDefinition::new("V", 7, 16).with_byte_order(ByteOrder::BigEndian));

        let data = encode_message(&msg, &values(&[("V", f64::from(0x1234))])).unwrap();
        assert_eq!(data, vec![0x12, 0x34]);
    }

    #[test]
    fn test_encode_signed_twos_complement() {
        let msg = MessageDefinition::new("Temp", 0x300)
            .with_length(1)
            .with_signal(SignalDefinition::new("T", 0, 8).signed());

        let data = encode_message(&msg, &values(&[("T", -2.0)])).unwrap();
        assert_eq!(data, vec![0xFE]);
    }

    #[test]
    fn test_encode_nibbles_do_not_clobber() {
        let msg = MessageDefinition::new("Nibbles", 0x301)
            .with_length(1)
            .with_signal(SignalDefinition::new("Lo", 0, 4))
            .with_signal(SignalDefinition::new("Hi", 4, 4));

        let data = encode_message(&msg, &values(&[("Lo", 0xA as f64), ("Hi", 0x5 as f64)])).unwrap();
        assert_eq!(data, vec![0x5A]);
    }

    #[test]
    fn test_encode_out_of_declared_range() {
        let msg = MessageDefinition::new("Throttle", 0x110)
            .with_signal(SignalDefinition::new("Pct", 0, 8).with_bounds(0.0, 100.0));

        let err = encode_message(&msg, &values(&[("Pct", 120.0)])).unwrap_err();
        assert!(matches!(err, DbcError::ValueOutOfRange { value, .. } if value == 120.0));
    }

    #[test]
    fn test_unbounded_skips_declared_range_only() {
        let msg = MessageDefinition::new("Heater", 0x120)
            .with_length(2)
            .with_signal(SignalDefinition::new("Power", 0, 8))
            .with_signal(SignalDefinition::new("Setpoint", 8, 8).with_bounds(10.0, 30.0));

        let data = encode_message_unbounded(&msg, &values(&[("Power", 1.0), ("Setpoint", 0.0)])).unwrap();
        assert_eq!(data, vec![1, 0]);
        assert!(encode_message(&msg, &values(&[("Power", 1.0), ("Setpoint", 0.0)])).is_err());

        assert!(matches!(
            encode_message_unbounded(&msg, &values(&[("Power", 256.0), ("Setpoint", 20.0)])),
            Err(DbcError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encode_message_unbounded(&msg, &values(&[("Power", f64::INFINITY), ("Setpoint", 20.0)])),
            Err(DbcError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_encode_out_of_bit_range() {
        let msg = MessageDefinition::new("Small", 0x111)
            .with_signal(SignalDefinition::new("N", 0, 4));

        assert!(matches!(
            encode_message(&msg, &values(&[("N", 16.0)])),
            Err(DbcError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encode_message(&msg, &values(&[("N", -1.0)])),
            Err(DbcError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_encode_missing_signal() {
        let msg = MessageDefinition::new("M", 0x100)
            .with_signal(SignalDefinition::new("A", 0, 8))
            .with_signal(SignalDefinition::new("B", 8, 8));

        let err = encode_message(&msg, &values(&[("A", 1.0)])).unwrap_err();
        assert!(matches!(err, DbcError::MissingSignal(name) if name == "B"));
    }

    #[test]
    fn test_encode_rejects_nan() {
        let msg = MessageDefinition::new("M", 0x100).with_signal(SignalDefinition::new("A", 0, 8));
        assert!(matches!(
            encode_message(&msg, &values(&[("A", f64::NAN)])),
            Err(DbcError::InvalidValue { .. })
        ));
    }
}
