//! Decoding frame payloads to physical signal values

use std::collections::BTreeMap;

use crate::definition::{MessageDefinition, SignalDefinition};
use crate::error::{DbcError, DbcResult};
use crate::precision::round_physical;

/// Decode every signal of a message from a payload
pub fn decode_message(def: &MessageDefinition, data: &[u8]) -> DbcResult<BTreeMap<String, f64>> {
    if data.len() < def.length {
        return Err(DbcError::DataTooShort {
            expected: def.length,
            actual: data.len(),
        });
    }

    Ok(def
        .signals
        .iter()
        .map(|signal| (signal.name.clone(), decode_signal(signal, data)))
        .collect())
}

/// Decode one signal; `data` must cover the signal's bits
pub fn decode_signal(signal: &SignalDefinition, data: &[u8]) -> f64 {
    let raw = unpack(data, signal);
    let value = if signal.signed && signal.length < 64 && raw >> (signal.length - 1) & 1 == 1 {
        // Sign-extend two's complement
        (raw | !signal.raw_mask()) as i64 as f64
    } else if signal.signed {
        raw as i64 as f64
    } else {
        raw as f64
    };
    round_physical(value * signal.scale + signal.offset, signal.scale, signal.offset)
}

fn unpack(data: &[u8], signal: &SignalDefinition) -> u64 {
    signal
        .bit_positions()
        .into_iter()
        .enumerate()
        .fold(0u64, |raw, (i, pos)| {
            let bit = (data[pos / 8] >> (pos % 8)) & 1;
            raw | (u64::from(bit) << i)
        })
}
