//! Parameter store - named values bridged onto CAN signals
//!
//! Every accepted set is stored, published to subscribers and, when the name
//! is bound to a signal, written to the bus through the encoder's
//! parameter-write path. CAN failures are logged, never returned: the
//! parameter write itself always succeeds.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::binding::{BindingMap, SignalTarget};
use crate::error::{GatewayError, GatewayResult};
use crate::link::CanLink;
use crate::value::{ParameterType, ParameterValue};

/// A named parameter; `value: None` means "remove"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value: Option<ParameterValue>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParameterType>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            kind: None,
        }
    }

    /// Removal notice for `name`
    pub fn removed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            kind: None,
        }
    }

    pub fn with_type(mut self, kind: ParameterType) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Parameter names a subscriber asked for
#[derive(Debug, Clone, Default)]
pub struct ParameterFilter {
    names: HashSet<String>,
}

impl ParameterFilter {
    pub fn new(names: &[String]) -> Self {
        Self {
            names: names.iter().cloned().collect(),
        }
    }

    /// Whether `name` is covered (an empty name set covers everything)
    pub fn matches(&self, name: &str) -> bool {
        self.names.is_empty() || self.names.contains(name)
    }

    /// Keep only the subscribed parameters of a batch
    pub fn filter(&self, batch: Vec<Parameter>) -> Vec<Parameter> {
        batch.into_iter().filter(|p| self.matches(&p.name)).collect()
    }
}

/// Receiver for published parameter batches
pub struct ParameterSubscription {
    filter: ParameterFilter,
    receiver: broadcast::Receiver<Vec<Parameter>>,
}

impl ParameterSubscription {
    pub fn filter(&self) -> &ParameterFilter {
        &self.filter
    }

    /// Next non-empty batch; `None` once the store is gone
    pub async fn recv(&mut self) -> Option<Vec<Parameter>> {
        loop {
            match self.receiver.recv().await {
                Ok(batch) => {
                    let batch = self.filter.filter(batch);
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Parameter subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Split into the name filter and the raw receiver, for stream adapters
    pub fn into_parts(self) -> (ParameterFilter, broadcast::Receiver<Vec<Parameter>>) {
        (self.filter, self.receiver)
    }
}

pub struct ParameterStore {
    parameters: RwLock<BTreeMap<String, Parameter>>,
    updates: broadcast::Sender<Vec<Parameter>>,
    link: Option<Arc<CanLink>>,
}

impl ParameterStore {
    /// Create a store; without a link parameters are never written to CAN
    pub fn new(link: Option<Arc<CanLink>>) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            parameters: RwLock::new(BTreeMap::new()),
            updates,
            link,
        }
    }

    /// Seed values without touching the bus, then publish them as one batch
    pub fn with_initial(self, initial: impl IntoIterator<Item = Parameter>) -> Self {
        let seeded: Vec<Parameter> = {
            let mut params = self.parameters.write();
            initial
                .into_iter()
                .filter(|p| p.value.is_some())
                .map(|p| {
                    params.insert(p.name.clone(), p.clone());
                    p
                })
                .collect()
        };
        if !seeded.is_empty() {
            tracing::info!(count = seeded.len(), "Initial parameters loaded");
            self.publish(seeded);
        }
        self
    }

    pub fn get_all(&self) -> Vec<Parameter> {
        self.parameters.read().values().cloned().collect()
    }

    /// Named parameters that exist; an empty list returns all
    pub fn get_by_names(&self, names: &[String]) -> Vec<Parameter> {
        if names.is_empty() {
            return self.get_all();
        }
        let params = self.parameters.read();
        names.iter().filter_map(|n| params.get(n).cloned()).collect()
    }

    pub fn get(&self, name: &str) -> GatewayResult<Parameter> {
        self.parameters
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownParameter(name.to_string()))
    }

    pub fn get_value(&self, name: &str) -> Option<ParameterValue> {
        self.parameters.read().get(name).and_then(|p| p.value.clone())
    }

    /// Store, publish and forward one parameter
    ///
    /// A CAN-backed parameter is stored while its message lock is held, so
    /// the store and the message state see concurrent writes in one order.
    /// Returns the stored parameter, or `None` when the value removed it.
    pub async fn set(&self, parameter: Parameter) -> Option<Parameter> {
        let (Some(link), Some(value)) = (self.link.as_ref(), parameter.value.clone()) else {
            return self.apply(parameter);
        };

        let name = parameter.name.clone();
        let mut pending = Some(parameter);
        let mut stored = None;
        let result = Self::forward(link, &name, &value, || {
            stored = pending.take().and_then(|p| self.apply(p));
        })
        .await;
        // Nothing was written under a message lock
        if let Some(parameter) = pending {
            stored = self.apply(parameter);
        }

        match result {
            Ok(()) | Err(ForwardError::Unbound) => {}
            Err(ForwardError::Failed(target, error)) => tracing::warn!(
                parameter = %name,
                message_name = %target.message,
                signal = %target.signal,
                error = %error,
                "Failed to write parameter to CAN"
            ),
            Err(ForwardError::Unavailable(error)) => tracing::warn!(
                parameter = %name,
                error = %error,
                "Failed to write parameter to CAN"
            ),
        }
        stored
    }

    /// Apply a client batch in order and return every parameter afterwards
    pub async fn set_many(&self, parameters: Vec<Parameter>) -> Vec<Parameter> {
        for parameter in parameters {
            self.set(parameter).await;
        }
        self.get_all()
    }

    /// Subscribe to `names` (all when empty)
    ///
    /// The current values of the covered parameters are published again so
    /// the new subscriber starts from a full picture.
    pub fn subscribe(&self, names: &[String]) -> ParameterSubscription {
        let subscription = ParameterSubscription {
            filter: ParameterFilter::new(names),
            receiver: self.updates.subscribe(),
        };
        self.publish(self.get_by_names(names));
        subscription
    }

    /// Bindings of the attached link
    pub fn bindings(&self) -> Option<&Arc<BindingMap>> {
        self.link.as_ref().map(|link| link.bindings())
    }

    /// Bind a parameter name to a signal
    pub fn bind(&self, parameter: &str, message: &str, signal: &str) -> GatewayResult<SignalTarget> {
        let link = self.link.as_ref().ok_or(GatewayError::BusUnavailable)?;
        link.bind(parameter, message, signal)
    }

    fn apply(&self, parameter: Parameter) -> Option<Parameter> {
        match parameter.value {
            Some(_) => {
                self.parameters
                    .write()
                    .insert(parameter.name.clone(), parameter.clone());
                self.publish(vec![parameter.clone()]);
                Some(parameter)
            }
            None => {
                if self.parameters.write().remove(&parameter.name).is_some() {
                    tracing::debug!(parameter = %parameter.name, "Parameter removed");
                    self.publish(vec![Parameter::removed(&parameter.name)]);
                }
                None
            }
        }
    }

    fn publish(&self, batch: Vec<Parameter>) {
        if batch.is_empty() {
            return;
        }
        // No receivers is fine
        let _ = self.updates.send(batch);
    }

    async fn forward<F: FnOnce()>(
        link: &CanLink,
        name: &str,
        value: &ParameterValue,
        on_locked: F,
    ) -> Result<(), ForwardError> {
        // Loading populates the derived bindings, so it has to come first
        let encoder = link.encoder();
        let target = link.bindings().resolve(name).ok_or(ForwardError::Unbound)?;
        let encoder = encoder.map_err(ForwardError::Unavailable)?;
        let result = match value.to_signal_value() {
            Ok(number) => {
                encoder
                    .write_signal_with(&target.message, &target.signal, number, on_locked)
                    .await
            }
            Err(reason) => Err(GatewayError::InvalidValue {
                key: name.to_string(),
                reason,
            }),
        };
        match result {
            Ok(sent) => {
                tracing::debug!(parameter = %name, frame = %sent.frame, "Parameter written to CAN");
                Ok(())
            }
            Err(e) => Err(ForwardError::Failed(target, e)),
        }
    }
}

enum ForwardError {
    /// Not every parameter is CAN-backed
    Unbound,
    Unavailable(GatewayError),
    Failed(SignalTarget, GatewayError),
}
