//! Signal encoder - full payloads from partial updates
//!
//! Two write paths share the per-message state:
//!
//! - **parameter write** (`write_signal`): one signal changes, every other
//!   signal keeps its value from the message state. Declared bounds are not
//!   enforced here, only the bit width.
//! - **command send** (`send_command`): a complete payload is synthesized from
//!   overrides, a fallback scalar, command defaults and schema metadata in the
//!   fixed order of [`COMMAND_ORDER`].
//!
//! Both hold the message lock from the state mutation until the frame is on
//! the bus.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cangw_bus::{CanFrame, TransportHandle};
use cangw_dbc::{encode_message, encode_message_unbounded, format_frame_id, MessageDefinition, SignalDefinition};
use chrono::{DateTime, Local};

use crate::error::{GatewayError, GatewayResult};
use crate::index::DatabaseIndex;
use crate::normalize::normalize;
use crate::state::{MessageState, MessageStateStore};

/// Where a synthesized signal value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Explicit per-signal override
    Override,
    /// The send's single fallback scalar
    Fallback,
    /// Configured command default
    CommandDefault,
    /// `initial` from the schema
    SchemaInitial,
    /// Last value stored in the message state
    PersistedState,
    /// `minimum` from the schema
    SchemaMinimum,
    Zero,
}

/// Priority used when synthesizing a command payload
pub const COMMAND_ORDER: &[ValueSource] = &[
    ValueSource::Override,
    ValueSource::Fallback,
    ValueSource::CommandDefault,
    ValueSource::SchemaInitial,
    ValueSource::PersistedState,
    ValueSource::SchemaMinimum,
    ValueSource::Zero,
];

/// Priority used for the per-message default template shown in listings
pub const TEMPLATE_ORDER: &[ValueSource] = &[
    ValueSource::CommandDefault,
    ValueSource::SchemaInitial,
    ValueSource::PersistedState,
    ValueSource::SchemaMinimum,
    ValueSource::Zero,
];

/// Values available for one signal while synthesizing a payload
#[derive(Debug, Clone, Copy, Default)]
pub struct Candidates {
    pub override_value: Option<f64>,
    pub fallback: Option<f64>,
    pub command_default: Option<f64>,
    pub persisted: Option<f64>,
}

impl ValueSource {
    fn pick(self, signal: &SignalDefinition, candidates: &Candidates) -> Option<f64> {
        match self {
            ValueSource::Override => candidates.override_value,
            ValueSource::Fallback => candidates.fallback,
            ValueSource::CommandDefault => candidates.command_default,
            ValueSource::SchemaInitial => signal.initial,
            ValueSource::PersistedState => candidates.persisted,
            ValueSource::SchemaMinimum => signal.minimum,
            ValueSource::Zero => Some(0.0),
        }
    }
}

/// First source in `order` that has a value for `signal`
pub fn first_match(
    order: &[ValueSource],
    signal: &SignalDefinition,
    candidates: &Candidates,
) -> (ValueSource, f64) {
    order
        .iter()
        .find_map(|source| source.pick(signal, candidates).map(|v| (*source, v)))
        .unwrap_or((ValueSource::Zero, 0.0))
}

/// Choose a value for every signal of `message` in schema order
///
/// The fallback is handed to the first signal not covered by an override and
/// then withdrawn, so at most one signal receives it.
pub fn synthesize(
    order: &[ValueSource],
    message: &MessageDefinition,
    overrides: &HashMap<String, f64>,
    fallback: Option<f64>,
    defaults: &HashMap<String, f64>,
    state: Option<&MessageState>,
) -> Vec<(String, ValueSource, f64)> {
    let mut fallback = fallback;
    message
        .signals
        .iter()
        .map(|signal| {
            let candidates = Candidates {
                override_value: overrides.get(&signal.name).copied(),
                fallback,
                command_default: defaults.get(&normalize(&signal.name)).copied(),
                persisted: state.and_then(|s| s.get(&signal.name).copied()),
            };
            let (source, value) = first_match(order, signal, &candidates);
            if source == ValueSource::Fallback {
                fallback = None;
            }
            (signal.name.clone(), source, value)
        })
        .collect()
}

/// A frame the encoder put on the bus
#[derive(Debug, Clone)]
pub struct SentFrame {
    pub message: String,
    pub frame: CanFrame,
    pub sent_at: DateTime<Local>,
}

impl SentFrame {
    /// Operator-facing confirmation line
    pub fn status_line(&self) -> String {
        format!(
            "Sent CAN message '{}' ({}) at {} data=0x{}",
            self.message,
            format_frame_id(self.frame.id()),
            self.sent_at.format("%H:%M:%S"),
            hex::encode_upper(self.frame.data())
        )
    }
}

/// Encodes messages from the shared state and sends them on the bus
pub struct SignalEncoder {
    index: Arc<DatabaseIndex>,
    state: MessageStateStore,
    /// Normalized signal name → command default
    defaults: HashMap<String, f64>,
    transport: Arc<TransportHandle>,
}

impl SignalEncoder {
    pub fn new(
        index: Arc<DatabaseIndex>,
        defaults: &HashMap<String, f64>,
        transport: Arc<TransportHandle>,
    ) -> Self {
        let state = MessageStateStore::new(&index);
        let defaults = defaults
            .iter()
            .map(|(name, value)| (normalize(name), *value))
            .collect();
        Self {
            index,
            state,
            defaults,
            transport,
        }
    }

    pub fn index(&self) -> &Arc<DatabaseIndex> {
        &self.index
    }

    /// Snapshot of a message's stored values
    pub async fn state(&self, message: &str) -> Option<MessageState> {
        self.state.get_state(message).await
    }

    /// Parameter-write path: update one signal and send the whole message
    ///
    /// The new value stays stored even when encoding or sending fails.
    pub async fn write_signal(
        &self,
        message: &str,
        signal: &str,
        value: f64,
    ) -> GatewayResult<SentFrame> {
        self.write_signal_with(message, signal, value, || {}).await
    }

    /// [`write_signal`](Self::write_signal), running `on_locked` once the
    /// message lock is held and before the state changes
    ///
    /// `on_locked` is not called when the target does not resolve.
    pub async fn write_signal_with<F: FnOnce()>(
        &self,
        message: &str,
        signal: &str,
        value: f64,
        on_locked: F,
    ) -> GatewayResult<SentFrame> {
        let (def, sig) = self.index.resolve_target(message, signal)?;

        let mut state = self
            .state
            .lock(&def.name)
            .await
            .ok_or_else(|| GatewayError::UnknownMessage(def.name.clone()))?;
        on_locked();
        state.insert(sig.name.clone(), value);

        let data = encode_message_unbounded(def, &state).map_err(|source| GatewayError::Encoding {
            message: def.name.clone(),
            source,
        })?;
        let sent = self.transmit(def, data).await?;
        tracing::debug!(
            message_name = %def.name,
            signal = %sig.name,
            value,
            frame = %sent.frame,
            "Signal written"
        );
        Ok(sent)
    }

    /// Command-send path: synthesize, encode and send a complete payload
    ///
    /// `overrides` must be keyed by canonical signal names. The synthesized
    /// values replace the message state only once encoding succeeded; a
    /// failed send does not roll them back.
    pub async fn send_command(
        &self,
        message: &MessageDefinition,
        fallback: Option<f64>,
        overrides: &HashMap<String, f64>,
    ) -> GatewayResult<SentFrame> {
        let mut state = self
            .state
            .lock(&message.name)
            .await
            .ok_or_else(|| GatewayError::UnknownMessage(message.name.clone()))?;

        let values: HashMap<String, f64> = synthesize(
            COMMAND_ORDER,
            message,
            overrides,
            fallback,
            &self.defaults,
            Some(&*state),
        )
        .into_iter()
        .map(|(name, _, value)| (name, value))
        .collect();

        let data = encode_message(message, &values).map_err(|source| GatewayError::Encoding {
            message: message.name.clone(),
            source,
        })?;
        state.extend(values);

        self.transmit(message, data).await
    }

    /// Default values offered for a message in listings
    pub async fn template(&self, message: &MessageDefinition) -> BTreeMap<String, f64> {
        let state = self.state.get_state(&message.name).await;
        synthesize(
            TEMPLATE_ORDER,
            message,
            &HashMap::new(),
            None,
            &self.defaults,
            state.as_ref(),
        )
        .into_iter()
        .map(|(name, _, value)| (name, value))
        .collect()
    }

    /// Map override keys onto canonical signal names of `message`
    pub fn resolve_overrides(
        &self,
        message: &MessageDefinition,
        overrides: &HashMap<String, f64>,
    ) -> GatewayResult<HashMap<String, f64>> {
        overrides
            .iter()
            .map(|(key, value)| {
                self.index
                    .resolve_signal(&message.name, key)
                    .map(|sig| (sig.name.clone(), *value))
                    .ok_or_else(|| GatewayError::UnknownSignal {
                        message: message.name.clone(),
                        signal: key.clone(),
                    })
            })
            .collect()
    }

    async fn transmit(&self, message: &MessageDefinition, data: Vec<u8>) -> GatewayResult<SentFrame> {
        let frame = CanFrame::new(message.frame_id, data, message.extended, message.fd)?;
        self.transport.send(&frame).await?;
        Ok(SentFrame {
            message: message.name.clone(),
            frame,
            sent_at: Local::now(),
        })
    }
}
