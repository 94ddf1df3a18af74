//! cangw-core - CAN signal gateway core
//!
//! Maps named values onto signals of a CAN database and keeps the last
//! value of every signal, so partial updates always produce complete frames.
//!
//! - [`CanLink`] owns the lazily loaded database, the encoder and the bus
//! - [`ParameterStore`] bridges parameter writes onto bound signals
//! - [`CommandGateway`] serves operator send/status requests

pub mod binding;
pub mod command;
pub mod encoder;
pub mod error;
pub mod index;
pub mod link;
pub mod normalize;
pub mod parameters;
pub mod state;
pub mod value;

#[cfg(test)]
mod test_support;

pub use binding::{BindingMap, SignalTarget};
pub use command::{AllowList, CommandGateway, MessageChoice, SendCommand, StatusSnapshot};
pub use encoder::{SentFrame, SignalEncoder, ValueSource, COMMAND_ORDER, TEMPLATE_ORDER};
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use index::DatabaseIndex;
pub use link::{CanLink, DatabaseLoader, FileDatabaseLoader, StaticDatabaseLoader};
pub use normalize::{normalize, qualified_key};
pub use parameters::{Parameter, ParameterFilter, ParameterStore, ParameterSubscription};
pub use state::{MessageState, MessageStateStore};
pub use value::{ParameterType, ParameterValue};
