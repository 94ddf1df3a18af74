//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::sync::Arc;

use cangw_bus::{MockConfig, MockTransport, TransportHandle};
use cangw_dbc::{MessageDefinition, SignalDatabase, SignalDefinition};

use crate::link::{CanLink, StaticDatabaseLoader};

/// Engine_Status, M1, M2 and an extended-id Door_Command
pub(crate) fn sample_database() -> SignalDatabase {
    SignalDatabase::new(vec![
        MessageDefinition::new("Engine_Status", 0x0C0)
            .with_length(4)
            .with_signal(
                SignalDefinition::new("Engine_RPM", 0, 16)
                    .with_scale(0.25, 0.0)
                    .with_bounds(0.0, 16383.75)
                    .with_unit("rpm"),
            )
            .with_signal(
                SignalDefinition::new("Coolant_Temp", 16, 8)
                    .with_scale(1.0, -40.0)
                    .with_initial(20.0),
            ),
        MessageDefinition::new("M1", 0x100)
            .with_length(3)
            .with_signal(SignalDefinition::new("SigA", 0, 8))
            .with_signal(SignalDefinition::new("SigB", 8, 8).with_initial(4.0))
            .with_signal(SignalDefinition::new("SigC", 16, 8).with_bounds(0.0, 200.0)),
        MessageDefinition::new("M2", 0x101)
            .with_length(2)
            .with_signal(SignalDefinition::new("Level", 0, 8))
            .with_signal(SignalDefinition::new("Mode", 8, 8).with_minimum(1.0).with_initial(1.0)),
        MessageDefinition::new("Door_Command", 0x18FF_0001)
            .extended()
            .with_length(1)
            .with_signal(SignalDefinition::new("Lock", 0, 2).with_bounds(0.0, 3.0)),
    ])
    .expect("sample database is valid")
}

/// Link over the sample database writing to a fresh mock transport
pub(crate) fn mock_link(defaults: HashMap<String, f64>) -> (Arc<CanLink>, Arc<MockTransport>) {
    let mock = Arc::new(MockTransport::new(&MockConfig::default()));
    let link = CanLink::new(
        Some(Box::new(StaticDatabaseLoader::new(sample_database()))),
        TransportHandle::owned(mock.clone()),
        defaults,
    );
    (Arc::new(link), mock)
}
