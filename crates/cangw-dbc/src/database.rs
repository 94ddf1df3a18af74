//! Signal database - the container for message definitions
//!
//! Provides lookup by name and frame id. Loaded once from a YAML (or JSON)
//! definition file and never mutated afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decode;
use crate::definition::MessageDefinition;
use crate::encode;
use crate::error::{DbcError, DbcResult};

/// Metadata about the database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMeta {
    /// Name of the bus/network described by the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// On-disk layout of a database file
#[derive(Debug, Serialize, Deserialize)]
struct DatabaseFile {
    #[serde(default)]
    meta: Option<DatabaseMeta>,
    #[serde(default)]
    messages: Vec<MessageDefinition>,
}

/// Read-only set of message definitions in file order
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    meta: DatabaseMeta,
    messages: Vec<MessageDefinition>,
    by_name: HashMap<String, usize>,
}

impl SignalDatabase {
    /// Build a database from message definitions, validating each one
    pub fn new(messages: Vec<MessageDefinition>) -> DbcResult<Self> {
        Self::with_meta(DatabaseMeta::default(), messages)
    }

    pub fn with_meta(meta: DatabaseMeta, messages: Vec<MessageDefinition>) -> DbcResult<Self> {
        let mut by_name = HashMap::with_capacity(messages.len());
        for (i, msg) in messages.iter().enumerate() {
            msg.validate()?;
            if by_name.insert(msg.name.clone(), i).is_some() {
                return Err(DbcError::InvalidMessage {
                    message: msg.name.clone(),
                    reason: "duplicate message name".to_string(),
                });
            }
            let mut seen = HashSet::new();
            for signal in &msg.signals {
                if !seen.insert(signal.name.as_str()) {
                    return Err(DbcError::InvalidSignal {
                        signal: signal.name.clone(),
                        reason: format!("duplicate signal in message '{}'", msg.name),
                    });
                }
            }
        }
        Ok(Self {
            meta,
            messages,
            by_name,
        })
    }

    /// Load definitions from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> DbcResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load definitions from a YAML string (JSON is accepted as well)
    pub fn from_yaml(yaml: &str) -> DbcResult<Self> {
        let file: DatabaseFile = serde_yaml::from_str(yaml)?;
        Self::with_meta(file.meta.unwrap_or_default(), file.messages)
    }

    /// Serialize the database back to YAML
    pub fn to_yaml(&self) -> DbcResult<String> {
        let file = DatabaseFile {
            meta: Some(self.meta.clone()),
            messages: self.messages.clone(),
        };
        Ok(serde_yaml::to_string(&file)?)
    }

    pub fn meta(&self) -> &DatabaseMeta {
        &self.meta
    }

    /// All messages in file order
    pub fn messages(&self) -> &[MessageDefinition] {
        &self.messages
    }

    /// Exact-name lookup
    pub fn message(&self, name: &str) -> Option<&MessageDefinition> {
        self.by_name.get(name).map(|&i| &self.messages[i])
    }

    pub fn message_by_frame_id(&self, frame_id: u32) -> Option<&MessageDefinition> {
        self.messages.iter().find(|m| m.frame_id == frame_id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Encode a payload for a named message
    pub fn encode(&self, name: &str, values: &HashMap<String, f64>) -> DbcResult<Vec<u8>> {
        let def = self
            .message(name)
            .ok_or_else(|| DbcError::UnknownMessage(name.to_string()))?;
        encode::encode_message(def, values)
    }

    /// Decode a payload for a named message
    pub fn decode(&self, name: &str, data: &[u8]) -> DbcResult<BTreeMap<String, f64>> {
        let def = self
            .message(name)
            .ok_or_else(|| DbcError::UnknownMessage(name.to_string()))?;
        decode::decode_message(def, data)
    }
}
