//! Parameter → signal bindings
//!
//! Keys are normalized parameter names. Entries derived from the database
//! (`"message.signal"` for every signal) never replace an existing key;
//! explicit bindings always do.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::index::DatabaseIndex;
use crate::normalize::{normalize, qualified_key};

/// Separators tried, in order, when a parameter name is not bound directly
const SEPARATORS: [char; 3] = ['.', '/', ':'];

/// Message/signal a parameter writes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTarget {
    pub message: String,
    pub signal: String,
}

impl SignalTarget {
    pub fn new(message: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signal: signal.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BindingMap {
    entries: RwLock<HashMap<String, SignalTarget>>,
}

impl BindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter name, replacing any existing entry for its key
    pub fn bind(&self, parameter: &str, target: SignalTarget) {
        let key = normalize(parameter);
        tracing::debug!(parameter, key = %key, message_name = %target.message, signal = %target.signal, "Binding parameter");
        self.entries.write().insert(key, target);
    }

    /// Register `message.signal` for every signal in the index
    ///
    /// Existing keys are kept. Returns the number of entries added.
    pub fn auto_populate(&self, index: &DatabaseIndex) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        for message in index.messages() {
            for signal in &message.signals {
                entries
                    .entry(qualified_key(&message.name, &signal.name))
                    .or_insert_with(|| SignalTarget::new(&message.name, &signal.name));
            }
        }
        entries.len() - before
    }

    /// Find the target of a parameter name
    ///
    /// Tries the normalized name, then for each separator present in the raw
    /// name splits once and looks up `"<left>.<right>"`.
    pub fn resolve(&self, parameter: &str) -> Option<SignalTarget> {
        let entries = self.entries.read();
        if let Some(target) = entries.get(&normalize(parameter)) {
            return Some(target.clone());
        }
        SEPARATORS.iter().find_map(|sep| {
            let (message, signal) = parameter.split_once(*sep)?;
            entries.get(&qualified_key(message, signal)).cloned()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Snapshot of all entries, keyed by normalized name
    pub fn entries(&self) -> HashMap<String, SignalTarget> {
        self.entries.read().clone()
    }
}
