//! CAN link - shared access to the database, encoder and transport
//!
//! The database is loaded lazily and loading is retried on every request
//! until it succeeds, so a missing or broken file degrades the gateway to
//! "database unavailable" instead of stopping it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use cangw_bus::TransportHandle;
use cangw_dbc::{DbcResult, SignalDatabase};
use parking_lot::RwLock;

use crate::binding::{BindingMap, SignalTarget};
use crate::encoder::SignalEncoder;
use crate::error::{GatewayError, GatewayResult};
use crate::index::DatabaseIndex;

/// Source of the signal database
pub trait DatabaseLoader: Send + Sync {
    fn load(&self) -> DbcResult<SignalDatabase>;

    /// Short description used in logs
    fn describe(&self) -> String;
}

/// Loads a YAML or JSON database file
#[derive(Debug, Clone)]
pub struct FileDatabaseLoader {
    path: PathBuf,
}

impl FileDatabaseLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatabaseLoader for FileDatabaseLoader {
    fn load(&self) -> DbcResult<SignalDatabase> {
        SignalDatabase::from_file(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Hands out an already loaded database
#[derive(Debug, Clone)]
pub struct StaticDatabaseLoader {
    database: SignalDatabase,
}

impl StaticDatabaseLoader {
    pub fn new(database: SignalDatabase) -> Self {
        Self { database }
    }
}

impl DatabaseLoader for StaticDatabaseLoader {
    fn load(&self) -> DbcResult<SignalDatabase> {
        Ok(self.database.clone())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

pub struct CanLink {
    loader: Option<Box<dyn DatabaseLoader>>,
    transport: Arc<TransportHandle>,
    defaults: HashMap<String, f64>,
    bindings: Arc<BindingMap>,
    encoder: RwLock<Option<Arc<SignalEncoder>>>,
}

impl CanLink {
    /// Create a link; nothing is loaded until first use
    ///
    /// `defaults` maps signal names to command defaults.
    pub fn new(
        loader: Option<Box<dyn DatabaseLoader>>,
        transport: TransportHandle,
        defaults: HashMap<String, f64>,
    ) -> Self {
        Self {
            loader,
            transport: Arc::new(transport),
            defaults,
            bindings: Arc::new(BindingMap::new()),
            encoder: RwLock::new(None),
        }
    }

    /// The encoder over the loaded database, loading it if needed
    ///
    /// Load failures are logged and reported as `DatabaseUnavailable`; the
    /// next call tries again.
    pub fn encoder(&self) -> GatewayResult<Arc<SignalEncoder>> {
        if let Some(encoder) = self.encoder.read().as_ref() {
            return Ok(encoder.clone());
        }

        let mut slot = self.encoder.write();
        if let Some(encoder) = slot.as_ref() {
            return Ok(encoder.clone());
        }

        let loader = self.loader.as_ref().ok_or_else(|| {
            tracing::warn!("No CAN database configured");
            GatewayError::DatabaseUnavailable
        })?;

        let encoder = self.build_encoder(loader.as_ref()).map_err(|e| {
            tracing::warn!(source = %loader.describe(), error = %e, "CAN database unavailable");
            GatewayError::DatabaseUnavailable
        })?;

        let added = self.bindings.auto_populate(encoder.index());
        tracing::info!(
            source = %loader.describe(),
            messages = encoder.index().messages().len(),
            bindings = added,
            "CAN database loaded"
        );

        *slot = Some(encoder.clone());
        Ok(encoder)
    }

    fn build_encoder(&self, loader: &dyn DatabaseLoader) -> GatewayResult<Arc<SignalEncoder>> {
        let index = DatabaseIndex::new(loader.load()?)?;
        Ok(Arc::new(SignalEncoder::new(
            Arc::new(index),
            &self.defaults,
            self.transport.clone(),
        )))
    }

    /// Whether the database has been loaded
    pub fn is_loaded(&self) -> bool {
        self.encoder.read().is_some()
    }

    pub fn bindings(&self) -> &Arc<BindingMap> {
        &self.bindings
    }

    /// Bind a parameter to a signal
    ///
    /// With the database loaded the target is checked and stored under its
    /// canonical names; otherwise it is stored as given and resolved on write.
    pub fn bind(&self, parameter: &str, message: &str, signal: &str) -> GatewayResult<SignalTarget> {
        let target = match self.encoder() {
            Ok(encoder) => {
                let (def, sig) = encoder.index().resolve_target(message, signal)?;
                SignalTarget::new(&def.name, &sig.name)
            }
            Err(_) => SignalTarget::new(message, signal),
        };
        self.bindings.bind(parameter, target.clone());
        Ok(target)
    }

    pub fn transport(&self) -> &Arc<TransportHandle> {
        &self.transport
    }

    /// Whether frames can still be sent
    pub fn is_bus_available(&self) -> bool {
        !self.transport.is_closed()
    }

    /// Release the transport (shut down only if owned)
    pub fn close(&self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_link, sample_database};
    use cangw_bus::{MockConfig, MockTransport};
    use std::io::Write;

    #[test]
    fn test_lazy_load_populates_bindings() {
        let (link, _mock) = mock_link(HashMap::new());
        assert!(!link.is_loaded());
        assert!(link.bindings().is_empty());

        let encoder = link.encoder().unwrap();
        assert!(link.is_loaded());
        assert_eq!(encoder.index().messages().len(), 4);
        assert_eq!(
            link.bindings().resolve("Engine_Status.Engine_RPM"),
            Some(SignalTarget::new("Engine_Status", "Engine_RPM"))
        );

        // Same encoder on later calls
        assert!(Arc::ptr_eq(&encoder, &link.encoder().unwrap()));
    }

    #[test]
    fn test_missing_database_retries_until_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.yaml");
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        let link = CanLink::new(
            Some(Box::new(FileDatabaseLoader::new(&path))),
            TransportHandle::borrowed(mock),
            HashMap::new(),
        );

        assert!(matches!(link.encoder(), Err(GatewayError::DatabaseUnavailable)));
        assert!(!link.is_loaded());

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(sample_database().to_yaml().unwrap().as_bytes())
            .unwrap();

        assert!(link.encoder().is_ok());
        assert!(link.is_loaded());
    }

    #[test]
    fn test_no_loader_is_unavailable() {
        let mock = Arc::new(MockTransport::new(&MockConfig::default()));
        let link = CanLink::new(None, TransportHandle::borrowed(mock), HashMap::new());
        assert!(matches!(link.encoder(), Err(GatewayError::DatabaseUnavailable)));
    }

    #[test]
    fn test_bind_resolves_canonical_names() {
        let (link, _mock) = mock_link(HashMap::new());
        let target = link.bind("throttle", "m2", "level").unwrap();
        assert_eq!(target, SignalTarget::new("M2", "Level"));
        assert_eq!(link.bindings().resolve("Throttle"), Some(target));

        assert!(matches!(
            link.bind("throttle", "m2", "torque"),
            Err(GatewayError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn test_close_shuts_down_owned_transport() {
        let (link, mock) = mock_link(HashMap::new());
        assert!(link.is_bus_available());
        link.close();
        assert!(!link.is_bus_available());
        assert_eq!(mock.shutdown_count(), 1);
    }
}
