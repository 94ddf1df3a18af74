//! Database index - normalized name lookup over a signal database
//!
//! Built once per loaded database. Lookups try the normalized key first and
//! then the same key with underscores removed, so `"engine rpm"` still finds
//! `Engine_RPM`. The second tier only answers when exactly one name matches.

use std::collections::HashMap;

use cangw_dbc::{MessageDefinition, SignalDatabase, SignalDefinition};

use crate::error::{GatewayError, GatewayResult};
use crate::normalize::normalize;

/// Normalized-name → position table for one namespace
#[derive(Debug, Default)]
struct NameTable {
    exact: HashMap<String, usize>,
    /// `None` marks a compact key shared by several names
    compact: HashMap<String, Option<usize>>,
}

impl NameTable {
    fn build<'a>(names: impl Iterator<Item = &'a str>) -> GatewayResult<Self> {
        let mut table = NameTable::default();
        let mut canonical: Vec<&str> = Vec::new();
        for (pos, name) in names.enumerate() {
            let key = normalize(name);
            if let Some(&existing) = table.exact.get(&key) {
                return Err(GatewayError::NameCollision {
                    key,
                    first: canonical[existing].to_string(),
                    second: name.to_string(),
                });
            }
            table
                .compact
                .entry(compact(&key))
                .and_modify(|slot| *slot = None)
                .or_insert(Some(pos));
            table.exact.insert(key, pos);
            canonical.push(name);
        }
        Ok(table)
    }

    fn lookup(&self, text: &str) -> Option<usize> {
        let key = normalize(text);
        if let Some(&pos) = self.exact.get(&key) {
            return Some(pos);
        }
        self.compact.get(&compact(&key)).copied().flatten()
    }
}

fn compact(key: &str) -> String {
    key.replace('_', "")
}

/// Read-only lookup structure over a loaded database
#[derive(Debug)]
pub struct DatabaseIndex {
    database: SignalDatabase,
    messages: NameTable,
    /// Per message (same order as the database) signal table
    signals: Vec<NameTable>,
}

impl DatabaseIndex {
    /// Index a database, rejecting names that normalize to the same key
    pub fn new(database: SignalDatabase) -> GatewayResult<Self> {
        let messages = NameTable::build(database.messages().iter().map(|m| m.name.as_str()))?;
        let signals = database
            .messages()
            .iter()
            .map(|m| NameTable::build(m.signals.iter().map(|s| s.name.as_str())))
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(Self {
            database,
            messages,
            signals,
        })
    }

    pub fn database(&self) -> &SignalDatabase {
        &self.database
    }

    /// All messages in schema order
    pub fn messages(&self) -> &[MessageDefinition] {
        self.database.messages()
    }

    /// Exact canonical-name lookup
    pub fn message(&self, canonical: &str) -> Option<&MessageDefinition> {
        self.database.message(canonical)
    }

    /// Case/punctuation insensitive message lookup
    pub fn resolve_message(&self, text: &str) -> Option<&MessageDefinition> {
        self.messages
            .lookup(text)
            .map(|pos| &self.database.messages()[pos])
    }

    /// Case/punctuation insensitive signal lookup, scoped to one message
    pub fn resolve_signal(&self, message: &str, text: &str) -> Option<&SignalDefinition> {
        let pos = self.messages.exact.get(&normalize(message))?;
        let def = &self.database.messages()[*pos];
        self.signals[*pos]
            .lookup(text)
            .map(|signal_pos| &def.signals[signal_pos])
    }

    /// Resolve both names, reporting which one failed
    pub fn resolve_target(
        &self,
        message: &str,
        signal: &str,
    ) -> GatewayResult<(&MessageDefinition, &SignalDefinition)> {
        let def = self
            .resolve_message(message)
            .ok_or_else(|| GatewayError::UnknownMessage(message.to_string()))?;
        let sig = self
            .resolve_signal(&def.name, signal)
            .ok_or_else(|| GatewayError::UnknownSignal {
                message: def.name.clone(),
                signal: signal.to_string(),
            })?;
        Ok((def, sig))
    }
}
