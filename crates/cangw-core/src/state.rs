//! Per-message signal state
//!
//! Every message owns a lock around the last value written for each of its
//! signals. The encoder holds that lock across "mutate → encode → send", which
//! linearizes writers to the same message while other messages proceed.

use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use crate::index::DatabaseIndex;

/// Canonical signal name → last written physical value
pub type MessageState = HashMap<String, f64>;

#[derive(Debug)]
pub struct MessageStateStore {
    states: HashMap<String, Mutex<MessageState>>,
}

impl MessageStateStore {
    /// One entry per message, seeded from each signal's initial value or zero
    pub fn new(index: &DatabaseIndex) -> Self {
        let states = index
            .messages()
            .iter()
            .map(|message| {
                let seeded = message
                    .signals
                    .iter()
                    .map(|s| (s.name.clone(), s.initial.unwrap_or(0.0)))
                    .collect();
                (message.name.clone(), Mutex::new(seeded))
            })
            .collect();
        Self { states }
    }

    /// Snapshot of a message's current values
    pub async fn get_state(&self, message: &str) -> Option<MessageState> {
        let state = self.states.get(message)?;
        Some(state.lock().await.clone())
    }

    /// Overwrite one signal value; returns false for an unknown message
    ///
    /// No range checks: values are validated when the message is encoded.
    pub async fn set_value(&self, message: &str, signal: &str, value: f64) -> bool {
        match self.lock(message).await {
            Some(mut state) => {
                state.insert(signal.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Exclusive access to a message's state
    pub async fn lock(&self, message: &str) -> Option<MutexGuard<'_, MessageState>> {
        match self.states.get(message) {
            Some(state) => Some(state.lock().await),
            None => None,
        }
    }
}
