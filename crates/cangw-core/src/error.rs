//! Gateway error types
//!
//! Every variant renders as the status text shown to operators, so the
//! `Display` strings are part of the command protocol.

use cangw_bus::TransportError;
use cangw_dbc::DbcError;
use serde::Serialize;
use thiserror::Error;

/// Broad error category, used for HTTP status mapping and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown message, signal or parameter
    Resolution,
    /// Target blocked by the allow-list
    Filter,
    /// Malformed input
    Validation,
    /// Schema-level encode failure
    Encoding,
    /// Bus write failed or bus unavailable
    Transport,
    /// Database could not be loaded or indexed
    Database,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Message '{0}' not found in CAN database.")]
    UnknownMessage(String),

    #[error("Signal '{signal}' not found in CAN message '{message}'.")]
    UnknownSignal { message: String, signal: String },

    #[error("Parameter '{0}' not found.")]
    UnknownParameter(String),

    #[error("CAN database has no messages.")]
    NoMessages,

    #[error("Message '{0}' is blocked by the current message filter.")]
    Filtered(String),

    #[error("No CAN messages match the allowed message filter.")]
    NoAllowedMessages,

    #[error("Invalid CAN value '{0}'")]
    InvalidNumber(String),

    #[error("Invalid payload JSON: {0}")]
    InvalidJson(String),

    #[error("Payload overrides must be a JSON object.")]
    OverridesNotObject,

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to encode {message}: {source}")]
    Encoding {
        message: String,
        #[source]
        source: DbcError,
    },

    #[error("Failed to send CAN message: {0}")]
    Transport(#[from] TransportError),

    #[error("CAN bus not available.")]
    BusUnavailable,

    #[error("CAN database unavailable.")]
    DatabaseUnavailable,

    #[error("Failed to load CAN database: {0}")]
    DatabaseLoad(#[from] DbcError),

    #[error("Ambiguous name '{key}': '{first}' and '{second}' normalize to the same key")]
    NameCollision {
        key: String,
        first: String,
        second: String,
    },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::UnknownMessage(_)
            | GatewayError::UnknownSignal { .. }
            | GatewayError::UnknownParameter(_)
            | GatewayError::NoMessages => ErrorKind::Resolution,
            GatewayError::Filtered(_) | GatewayError::NoAllowedMessages => ErrorKind::Filter,
            GatewayError::InvalidNumber(_)
            | GatewayError::InvalidJson(_)
            | GatewayError::OverridesNotObject
            | GatewayError::InvalidValue { .. } => ErrorKind::Validation,
            GatewayError::Encoding { .. } => ErrorKind::Encoding,
            GatewayError::Transport(_) | GatewayError::BusUnavailable => ErrorKind::Transport,
            GatewayError::DatabaseUnavailable
            | GatewayError::DatabaseLoad(_)
            | GatewayError::NameCollision { .. } => ErrorKind::Database,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(
            GatewayError::UnknownMessage("Foo".into()).to_string(),
            "Message 'Foo' not found in CAN database."
        );
        assert_eq!(
            GatewayError::Filtered("M2".into()).to_string(),
            "Message 'M2' is blocked by the current message filter."
        );
        assert_eq!(
            GatewayError::InvalidValue {
                key: "A".into(),
                reason: "could not convert string to float: 'x'".into()
            }
            .to_string(),
            "Invalid value for 'A': could not convert string to float: 'x'"
        );
        assert_eq!(
            GatewayError::Transport(TransportError::SendFailed("bus off".into())).to_string(),
            "Failed to send CAN message: Send failed: bus off"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(GatewayError::NoAllowedMessages.kind(), ErrorKind::Filter);
        assert_eq!(GatewayError::OverridesNotObject.kind(), ErrorKind::Validation);
        assert_eq!(GatewayError::BusUnavailable.kind(), ErrorKind::Transport);
        assert_eq!(GatewayError::DatabaseUnavailable.kind(), ErrorKind::Database);
        assert_eq!(
            GatewayError::Encoding {
                message: "M".into(),
                source: DbcError::MissingSignal("A".into())
            }
            .kind(),
            ErrorKind::Encoding
        );
    }
}
