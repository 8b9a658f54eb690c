//! Service registry: which services exist, how critical they are, and how
//! much demand each can take before it counts as overloaded.
//!
//! The registry is loaded once and never changes for the life of the
//! process. Its order matters: it breaks ties in the priority order.

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One registered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,

    /// Static criticality, lower is more critical (1 = most critical)
    pub priority: u32,

    /// Demand level above which the service is considered overloaded
    pub demand_threshold: f64,
}

impl ServiceDescriptor {
    pub fn new<S: Into<String>>(id: S, priority: u32, demand_threshold: f64) -> Self {
        Self {
            id: id.into(),
            priority,
            demand_threshold,
        }
    }
}

/// JSON registry entry: `{"servicio_db": {"priority": 1, "demand_threshold": 100}}`
#[derive(Debug, Deserialize)]
struct JsonEntry {
    priority: u32,
    demand_threshold: f64,
}

/// TOML registry document: an array of `[[services]]` tables
#[derive(Debug, Deserialize)]
struct TomlRegistry {
    services: Vec<ServiceDescriptor>,
}

/// Immutable table of services in registry order
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRegistry {
    services: IndexMap<String, ServiceDescriptor>,
}

impl ServiceRegistry {
    /// Build a registry, rejecting duplicates and out-of-range values
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self, ConfigError> {
        if services.is_empty() {
            return Err(ConfigError::InvalidRegistry(
                "registry must contain at least one service".to_string(),
            ));
        }

        let mut table = IndexMap::with_capacity(services.len());
        for service in services {
            if service.id.trim().is_empty() {
                return Err(ConfigError::InvalidRegistry(
                    "service id must not be empty".to_string(),
                ));
            }
            if service.priority == 0 {
                return Err(ConfigError::InvalidRegistry(format!(
                    "{}: priority must be at least 1",
                    service.id
                )));
            }
            if !service.demand_threshold.is_finite() || service.demand_threshold <= 0.0 {
                return Err(ConfigError::InvalidRegistry(format!(
                    "{}: demand_threshold must be a positive number",
                    service.id
                )));
            }
            if table.contains_key(&service.id) {
                return Err(ConfigError::InvalidRegistry(format!(
                    "duplicate service id: {}",
                    service.id
                )));
            }
            table.insert(service.id.clone(), service);
        }

        Ok(Self { services: table })
    }

    /// The set used when no registry document is available
    pub fn builtin() -> Self {
        Self {
            services: [
                ServiceDescriptor::new("servicio_db", 1, 100.0),
                ServiceDescriptor::new("servicio_api", 2, 80.0),
                ServiceDescriptor::new("servicio_web", 3, 50.0),
            ]
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect(),
        }
    }

    /// Load a registry document; the format follows the file extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::MissingRegistry(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Self::from_json(&contents).map_err(|e| with_path(e, path)),
            Some("toml") => Self::from_toml(&contents).map_err(|e| with_path(e, path)),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Load a registry document, falling back to [`ServiceRegistry::builtin`]
    /// when the document does not exist. Any other problem is an error.
    pub fn load_or_builtin(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Ok(registry) => {
                info!(
                    "Loaded {} services from {}",
                    registry.len(),
                    path.display()
                );
                Ok(registry)
            }
            Err(ConfigError::MissingRegistry(_)) => {
                warn!(
                    "Service registry {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::builtin())
            }
            Err(e) => Err(e),
        }
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let entries: IndexMap<String, JsonEntry> =
            serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                path: Default::default(),
                reason: e.to_string(),
            })?;

        Self::new(
            entries
                .into_iter()
                .map(|(id, e)| ServiceDescriptor::new(id, e.priority, e.demand_threshold))
                .collect(),
        )
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let doc: TomlRegistry = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: Default::default(),
            reason: e.to_string(),
        })?;
        Self::new(doc.services)
    }

    pub fn get(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.get(id)
    }

    /// Services in registry order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn with_path(err: ConfigError, path: &Path) -> ConfigError {
    match err {
        ConfigError::Parse { reason, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builtin_registry() {
        let registry = ServiceRegistry::builtin();
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec!["servicio_db", "servicio_api", "servicio_web"]);
        assert_eq!(registry.get("servicio_api").unwrap().demand_threshold, 80.0);
    }

    #[test]
    fn test_json_preserves_document_order() {
        let registry = ServiceRegistry::from_json(
            r#"{
                "web": {"priority": 3, "demand_threshold": 50},
                "db": {"priority": 1, "demand_threshold": 100},
                "api": {"priority": 2, "demand_threshold": 80}
            }"#,
        )
        .unwrap();

        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec!["web", "db", "api"]);
        assert_eq!(registry.get("db").unwrap().priority, 1);
    }

    #[test]
    fn test_toml_registry() {
        let registry = ServiceRegistry::from_toml(
            r#"
            [[services]]
            id = "db"
            priority = 1
            demand_threshold = 100.0

            [[services]]
            id = "cache"
            priority = 4
            demand_threshold = 10.5
            "#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("cache").unwrap().demand_threshold, 10.5);
    }

    #[test]
    fn test_validation_failures() {
        let zero_priority = ServiceRegistry::new(vec![ServiceDescriptor::new("a", 0, 10.0)]);
        assert!(matches!(zero_priority, Err(ConfigError::InvalidRegistry(_))));

        let bad_threshold = ServiceRegistry::new(vec![ServiceDescriptor::new("a", 1, 0.0)]);
        assert!(bad_threshold.is_err());

        let nan_threshold = ServiceRegistry::new(vec![ServiceDescriptor::new("a", 1, f64::NAN)]);
        assert!(nan_threshold.is_err());

        let duplicate = ServiceRegistry::new(vec![
            ServiceDescriptor::new("a", 1, 10.0),
            ServiceDescriptor::new("a", 2, 10.0),
        ]);
        assert!(duplicate.is_err());

        assert!(ServiceRegistry::new(vec![]).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_builtin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("critical_services.json");

        assert!(matches!(
            ServiceRegistry::load(&path),
            Err(ConfigError::MissingRegistry(_))
        ));
        assert_eq!(
            ServiceRegistry::load_or_builtin(&path).unwrap(),
            ServiceRegistry::builtin()
        );
    }

    #[test]
    fn test_corrupt_file_is_not_replaced_by_builtin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("critical_services.json");
        std::fs::write(&path, "{ broken").unwrap();

        let err = ServiceRegistry::load_or_builtin(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("services.yaml");
        std::fs::write(&path, "db: 1").unwrap();

        assert!(matches!(
            ServiceRegistry::load(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
