//! Daemon configuration file
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [can]
//! database = "body.yaml"
//! default_message = "Lamp_Control"
//! allowed_messages = "Engine_Status, Lamp_Control"
//!
//! [can.defaults]
//! Brightness = 50
//!
//! [transport]
//! type = "socketcan"
//! interface = "can0"
//!
//! [[bindings]]
//! parameter = "dimmer"
//! message = "Lamp_Control"
//! signal = "Brightness"
//!
//! [parameters]
//! speed = 0
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cangw_bus::TransportConfig;
use cangw_core::{AllowList, Parameter, ParameterValue};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub can: CanConfig,
    pub transport: TransportConfig,
    pub bindings: Vec<BindingConfig>,
    /// Values published at startup
    pub parameters: BTreeMap<String, ParameterValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CanConfig {
    /// YAML/JSON signal database
    pub database: Option<PathBuf>,
    /// Message selected before the first send
    pub default_message: Option<String>,
    pub allowed_messages: Option<AllowedMessages>,
    /// Command default per signal name
    pub defaults: HashMap<String, f64>,
}

/// Allow-list as a separated string or a list of names
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AllowedMessages {
    Text(String),
    List(Vec<String>),
}

impl AllowedMessages {
    pub fn to_allow_list(&self) -> AllowList {
        match self {
            AllowedMessages::Text(text) => AllowList::parse(text),
            AllowedMessages::List(names) => AllowList::from_names(names),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BindingConfig {
    pub parameter: String,
    pub message: String,
    pub signal: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Allow-list from the config, else from `fallback` (the environment)
    pub fn allow_list(&self, fallback: Option<&str>) -> AllowList {
        match (&self.can.allowed_messages, fallback) {
            (Some(configured), _) => configured.to_allow_list(),
            (None, Some(text)) => AllowList::parse(text),
            (None, None) => AllowList::default(),
        }
    }

    pub fn initial_parameters(&self) -> Vec<Parameter> {
        self.parameters
            .iter()
            .map(|(name, value)| Parameter::new(name.clone(), value.clone()))
            .collect()
    }
}
