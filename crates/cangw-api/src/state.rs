//! Application state for the gateway API

use std::sync::Arc;

use cangw_core::{CommandGateway, ParameterStore};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<CommandGateway>,
    parameters: Arc<ParameterStore>,
}

impl AppState {
    pub fn new(gateway: Arc<CommandGateway>, parameters: Arc<ParameterStore>) -> Self {
        Self {
            gateway,
            parameters,
        }
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }
}
