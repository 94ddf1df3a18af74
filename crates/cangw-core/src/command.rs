//! Command gateway - the operator send/status protocol
//!
//! Translates `send` and `status` requests into encoder calls, applies the
//! message allow-list and keeps the operator-facing status line and the
//! currently selected message.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use cangw_dbc::{format_frame_id, MessageDefinition};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::encoder::{SentFrame, SignalEncoder};
use crate::error::{GatewayError, GatewayResult};
use crate::link::CanLink;
use crate::value::{coerce_json, parse_number};

/// Case-insensitive set of message names that may be targeted
///
/// An empty list allows every message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    names: HashSet<String>,
}

impl AllowList {
    /// Parse a `,` / `;` / newline separated list
    pub fn parse(raw: &str) -> Self {
        Self::from_names(raw.split([',', ';', '\n']))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn allows(&self, message: &str) -> bool {
        self.names.is_empty() || self.names.contains(&message.to_lowercase())
    }
}

/// A send request as received from the operator
#[derive(Debug, Clone, Default)]
pub struct SendCommand {
    /// Target message; defaults to the current message
    pub message: Option<String>,
    /// Fallback scalar for the first signal without an override
    pub value: Option<String>,
    /// JSON object of per-signal overrides
    pub payload: Option<String>,
}

/// One selectable message in a status listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageChoice {
    pub name: String,
    pub frame_id: u32,
    /// `"<name> (0x<ID>)"`
    pub label: String,
    /// Default value per signal
    pub template: BTreeMap<String, f64>,
    /// Lower-cased signal names in schema order
    pub signal_names: Vec<String>,
    pub selected: bool,
}

/// Status data for the command page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "canStatusMessage")]
    pub status_text: String,
    #[serde(rename = "currentMessage")]
    pub current_message: Option<String>,
    #[serde(rename = "messageOptions")]
    pub choices: Vec<MessageChoice>,
}

#[derive(Debug)]
struct GatewayState {
    status: String,
    current: Option<String>,
}

pub struct CommandGateway {
    link: Arc<CanLink>,
    allow_list: AllowList,
    preferred: Option<String>,
    state: Mutex<GatewayState>,
}

impl CommandGateway {
    /// `preferred` is the message selected once the database is listed
    pub fn new(link: Arc<CanLink>, allow_list: AllowList, preferred: Option<String>) -> Self {
        let status = match &preferred {
            Some(name) => format!("Ready to send CAN command '{}'", name),
            None => "Select a CAN message to send.".to_string(),
        };
        Self {
            link,
            allow_list,
            preferred,
            state: Mutex::new(GatewayState {
                status,
                current: None,
            }),
        }
    }

    pub fn status_text(&self) -> String {
        self.state.lock().status.clone()
    }

    pub fn current_message(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Run a send and return the resulting status line
    ///
    /// Failures are reported through the status line as well.
    pub async fn send(&self, command: SendCommand) -> String {
        let status = match self.try_send(command).await {
            Ok(sent) => {
                tracing::info!(
                    message_name = %sent.message,
                    frame_id = %format_frame_id(sent.frame.id()),
                    data = %hex::encode_upper(sent.frame.data()),
                    "CAN command sent"
                );
                sent.status_line()
            }
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "CAN command failed");
                e.to_string()
            }
        };
        self.state.lock().status = status.clone();
        status
    }

    /// Run a send, returning the frame or the first error
    ///
    /// Nothing is mutated or sent unless the value and overrides are valid
    /// and the target passes the allow-list. A target that passes becomes
    /// the current message even if encoding or sending then fails.
    pub async fn try_send(&self, command: SendCommand) -> GatewayResult<SentFrame> {
        if !self.link.is_bus_available() {
            return Err(GatewayError::BusUnavailable);
        }

        let fallback = match command.value.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_number(raw).map_err(|_| GatewayError::InvalidNumber(raw.to_string()))?),
        };
        let overrides = parse_overrides(command.payload.as_deref())?;

        let encoder = self.link.encoder()?;
        let message = self.select_target(&encoder, command.message.as_deref())?;
        let overrides = encoder.resolve_overrides(&message, &overrides)?;
        self.state.lock().current = Some(message.name.clone());

        encoder.send_command(&message, fallback, &overrides).await
    }

    /// Current status with the allow-listed message choices
    pub async fn status(&self) -> StatusSnapshot {
        let choices = match self.list_choices().await {
            Ok(choices) => choices,
            Err(e) => {
                self.state.lock().status = e.to_string();
                Vec::new()
            }
        };
        let state = self.state.lock();
        StatusSnapshot {
            status_text: state.status.clone(),
            current_message: state.current.clone(),
            choices,
        }
    }

    async fn list_choices(&self) -> GatewayResult<Vec<MessageChoice>> {
        let encoder = self.link.encoder()?;
        let allowed = self.allowed_messages(&encoder)?;
        let current = self.refresh_current(&encoder, &allowed);

        let mut choices = Vec::with_capacity(allowed.len());
        for message in allowed {
            choices.push(MessageChoice {
                name: message.name.clone(),
                frame_id: message.frame_id,
                label: format!("{} ({})", message.name, format_frame_id(message.frame_id)),
                template: encoder.template(&message).await,
                signal_names: message.signals.iter().map(|s| s.name.to_lowercase()).collect(),
                selected: message.name == current,
            });
        }
        Ok(choices)
    }

    /// Allow-listed messages in schema order; clears the selection when none
    fn allowed_messages(&self, encoder: &SignalEncoder) -> GatewayResult<Vec<MessageDefinition>> {
        let messages = encoder.index().messages();
        if messages.is_empty() {
            self.state.lock().current = None;
            return Err(GatewayError::NoMessages);
        }
        let allowed: Vec<_> = messages
            .iter()
            .filter(|m| self.allow_list.allows(&m.name))
            .cloned()
            .collect();
        if allowed.is_empty() {
            self.state.lock().current = None;
            return Err(if self.allow_list.is_empty() {
                GatewayError::NoMessages
            } else {
                GatewayError::NoAllowedMessages
            });
        }
        Ok(allowed)
    }

    /// Keep the current message if still allowed, else the preferred one,
    /// else the first allowed message
    fn refresh_current(&self, encoder: &SignalEncoder, allowed: &[MessageDefinition]) -> String {
        let is_allowed = |name: &str| allowed.iter().any(|m| m.name == name);
        let mut state = self.state.lock();

        let current = state
            .current
            .clone()
            .filter(|name| is_allowed(name))
            .or_else(|| {
                self.preferred
                    .as_deref()
                    .and_then(|p| encoder.index().resolve_message(p))
                    .map(|m| m.name.clone())
                    .filter(|name| is_allowed(name))
            })
            .unwrap_or_else(|| allowed[0].name.clone());

        state.current = Some(current.clone());
        current
    }

    fn select_target(&self, encoder: &SignalEncoder, requested: Option<&str>) -> GatewayResult<MessageDefinition> {
        let requested = requested.filter(|name| !name.trim().is_empty());
        let target = match requested {
            Some(name) => Some(name.to_string()),
            None => self.current_message(),
        };

        match target {
            Some(name) => {
                let message = encoder
                    .index()
                    .resolve_message(&name)
                    .ok_or_else(|| GatewayError::UnknownMessage(name.clone()))?;
                if !self.allow_list.allows(&message.name) {
                    return Err(GatewayError::Filtered(name));
                }
                Ok(message.clone())
            }
            None => {
                let allowed = self.allowed_messages(encoder)?;
                let preferred = self
                    .preferred
                    .as_deref()
                    .and_then(|p| encoder.index().resolve_message(p))
                    .filter(|m| self.allow_list.allows(&m.name));
                Ok(preferred.cloned().unwrap_or_else(|| allowed[0].clone()))
            }
        }
    }
}

/// Parse the overrides JSON into signal-name → value
fn parse_overrides(raw: Option<&str>) -> GatewayResult<HashMap<String, f64>> {
    let raw = match raw {
        None | Some("") => return Ok(HashMap::new()),
        Some(raw) => raw,
    };
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| GatewayError::InvalidJson(e.to_string()))?;
    let Value::Object(object) = parsed else {
        return Err(GatewayError::OverridesNotObject);
    };
    object
        .iter()
        .map(|(key, value)| {
            coerce_json(value)
                .map(|v| (key.clone(), v))
                .map_err(|reason| GatewayError::InvalidValue {
                    key: key.clone(),
                    reason,
                })
        })
        .collect()
}
