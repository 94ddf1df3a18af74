//! cangw-dbc - CAN signal database and frame codec
//!
//! Describes which signals a CAN message carries and converts between
//! physical signal values and payload bytes.
//!
//! # Features
//!
//! - **YAML definition files** - human-readable message/signal layouts (JSON works too)
//! - **Intel and Motorola byte order** - DBC-style bit numbering
//! - **Scale/offset with range checks** - values are validated before packing
//! - **Precision-aware decoding** - no ugly `1.4000000000000001` values
//!
//! # Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use cangw_dbc::{MessageDefinition, SignalDefinition, SignalDatabase};
//!
//! let db = SignalDatabase::new(vec![MessageDefinition::new("Engine", 0x0C0)
//!     .with_length(2)
//!     .with_signal(SignalDefinition::new("RPM", 0, 16).with_scale(0.25, 0.0))])
//! .unwrap();
//!
//! let values = HashMap::from([("RPM".to_string(), 1800.0)]);
//! let bytes = db.encode("Engine", &values).unwrap();
//! assert_eq!(bytes, vec![0x20, 0x1C]);
//! ```
//!
//! # YAML Definition Files
//!
//! ```yaml
//! meta:
//!   name: Body CAN
//!   version: "1.0"
//!
//! messages:
//!   - name: Engine_Status
//!     frame_id: 0x0C0
//!     length: 4
//!     signals:
//!       - name: Engine_RPM
//!         start_bit: 0
//!         length: 16
//!         scale: 0.25
//!         unit: rpm
//!       - name: Coolant_Temp
//!         start_bit: 16
//!         length: 8
//!         offset: -40
//!         initial: 20
//! ```

pub mod database;
pub mod decode;
pub mod definition;
pub mod encode;
pub mod error;
pub mod precision;
pub mod types;

pub use database::{DatabaseMeta, SignalDatabase};
pub use decode::{decode_message, decode_signal};
pub use definition::{MessageDefinition, SignalDefinition};
pub use encode::{encode_message, encode_message_unbounded};
pub use error::{format_frame_id, parse_frame_id, DbcError, DbcResult};
pub use precision::round_physical;
pub use types::{ByteOrder, CLASSIC_MAX_LEN, FD_MAX_LEN};
