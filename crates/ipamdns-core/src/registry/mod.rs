//! Plugin-based backend registry
//!
//! The registry allows record backends to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains over backend types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ipamdns_core::registry::BackendRegistry;
//!
//! // Built-in backends (dry_run, memory)
//! let registry = BackendRegistry::with_builtin();
//!
//! // Backends from other crates
//! ipamdns_backend_rfc2136::register(&registry);
//!
//! // Create a backend for one zone from config
//! let backend = registry.create_backend(&zone, &zone_config.backend, &settings)?;
//! ```

use crate::backend::{DryRunBackendFactory, MemoryBackendFactory};
use crate::config::{BackendConfig, BackendSettings};
use crate::error::{Error, Result};
use crate::name::DomainName;
use crate::traits::{RecordBackend, RecordBackendFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Backend registry for plugin-based backend creation
///
/// Maps backend type names to factory objects, allowing backends to be
/// instantiated from configuration.
///
/// ## Thread Safety
///
/// Interior mutability with RwLock allows concurrent reads and exclusive
/// writes.
#[derive(Default)]
pub struct BackendRegistry {
    /// Registered backend factories
    factories: RwLock<HashMap<String, Arc<dyn RecordBackendFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-process backends registered
    ///
    /// `dry_run` and `memory` are always available; `memory` backends share
    /// one store per registry.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_backend("dry_run", Box::new(DryRunBackendFactory));
        registry.register_backend("memory", Box::new(MemoryBackendFactory::default()));
        registry
    }

    /// Register a backend factory
    ///
    /// # Parameters
    ///
    /// - `name`: Backend type name (e.g., "rfc2136", "dry_run")
    /// - `factory`: Factory object for creating backend instances
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_backend(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RecordBackendFactory>,
    ) {
        let name = name.into();
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(name, Arc::from(factory));
    }

    /// Create a backend for `zone` from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn RecordBackend>)`: Created backend instance
    /// - `Err(Error)`: If the backend type is not registered or creation fails
    pub fn create_backend(
        &self,
        zone: &DomainName,
        config: &BackendConfig,
        settings: &BackendSettings,
    ) -> Result<Arc<dyn RecordBackend>> {
        let backend_type = config.type_name();

        let factory = {
            let factories = self
                .factories
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            factories
                .get(backend_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown backend type: {}", backend_type)))?
        };

        factory.create(zone, config, settings)
    }

    /// List all registered backend types
    pub fn list_backends(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend type is registered
    pub fn has_backend(&self, name: &str) -> bool {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockBackendFactory;

    impl RecordBackendFactory for MockBackendFactory {
        fn create(
            &self,
            _zone: &DomainName,
            _config: &BackendConfig,
            _settings: &BackendSettings,
        ) -> Result<Arc<dyn RecordBackend>> {
            Err(Error::config("Mock backend not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let registry = BackendRegistry::new();

        // Initially empty
        assert!(!registry.has_backend("mock"));

        // Register
        registry.register_backend("mock", Box::new(MockBackendFactory));

        // Now present
        assert!(registry.has_backend("mock"));
        assert!(registry.list_backends().contains(&"mock".to_string()));
    }

    #[test]
    fn test_builtin_backends() {
        let registry = BackendRegistry::with_builtin();
        assert_eq!(registry.list_backends(), vec!["dry_run", "memory"]);

        let zone = DomainName::parse("example.com").unwrap();
        let backend = registry
            .create_backend(&zone, &BackendConfig::DryRun, &BackendSettings::default())
            .unwrap();
        assert_eq!(backend.backend_name(), "dry_run");
        assert_eq!(backend.zone(), &zone);
    }

    #[test]
    fn test_unknown_backend_type() {
        let registry = BackendRegistry::with_builtin();
        let zone = DomainName::parse("example.com").unwrap();
        let config = BackendConfig::Rfc2136 {
            server: "127.0.0.1".to_string(),
            key: None,
        };

        let err = registry
            .create_backend(&zone, &config, &BackendSettings::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown backend type: rfc2136"));
    }
}
