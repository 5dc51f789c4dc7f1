// Adapter Resolver
//
// Maps an arbitrary dataset handle to the constructor of the adapter that
// understands it. Probes are tried in priority order; the first match is
// memoized per concrete type so later lookups skip probing.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use datafusion::arrow::record_batch::RecordBatch;

use crate::api::middleware::AppError;
use crate::models::{DatasetKind, Record};
use super::dataset::{
    AdapterOptions, ArrowBatchAdapter, CloudDatasetAdapter, Connector, DatabaseConnectorAdapter,
    DatasetAdapter, DatasetHandle, DistributedFrame, DistributedFrameAdapter, JsonRecordsAdapter,
};

/// Backend families an adapter can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Arrow,
    JsonRecords,
    Distributed,
    Connector,
    Cloud,
    /// Backend contributed by the embedding application
    Custom(&'static str),
}

impl Backend {
    pub const BUILT_IN: [Backend; 5] = [
        Backend::Arrow,
        Backend::JsonRecords,
        Backend::Distributed,
        Backend::Connector,
        Backend::Cloud,
    ];

    pub fn from_str(s: &str) -> Result<Self, AppError> {
        match s.trim().to_lowercase().as_str() {
            "arrow" => Ok(Backend::Arrow),
            "json_records" | "json" => Ok(Backend::JsonRecords),
            "distributed" | "spark" => Ok(Backend::Distributed),
            "connector" => Ok(Backend::Connector),
            "cloud" => Ok(Backend::Cloud),
            other => Err(AppError::Validation(format!("Unknown backend: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Arrow => "arrow",
            Backend::JsonRecords => "json_records",
            Backend::Distributed => "distributed",
            Backend::Connector => "connector",
            Backend::Cloud => "cloud",
            Backend::Custom(name) => *name,
        }
    }
}

/// Backends available to this process, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFeatures {
    enabled: HashSet<Backend>,
}

impl BackendFeatures {
    pub fn all() -> Self {
        Self {
            enabled: Backend::BUILT_IN.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self {
            enabled: HashSet::new(),
        }
    }

    /// Parse backend names from configuration; an empty list enables everything
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, AppError> {
        if names.is_empty() {
            return Ok(Self::all());
        }

        let enabled = names
            .iter()
            .map(|name| Backend::from_str(name.as_ref()))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self { enabled })
    }

    pub fn with(mut self, backend: Backend) -> Self {
        self.enabled.insert(backend);
        self
    }

    pub fn without(mut self, backend: Backend) -> Self {
        self.enabled.remove(&backend);
        self
    }

    /// Custom backends are always available once registered
    pub fn is_enabled(&self, backend: Backend) -> bool {
        matches!(backend, Backend::Custom(_)) || self.enabled.contains(&backend)
    }
}

impl Default for BackendFeatures {
    fn default() -> Self {
        Self::all()
    }
}

pub type AdapterFactory =
    fn(&DatasetHandle, &AdapterOptions) -> Result<Box<dyn DatasetAdapter>, AppError>;

/// Builds one adapter variant from a recognized handle
#[derive(Clone, Copy)]
pub struct AdapterConstructor {
    pub name: &'static str,
    pub kind: DatasetKind,
    pub build: AdapterFactory,
}

impl AdapterConstructor {
    pub fn build(
        &self,
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        (self.build)(handle, options)
    }
}

impl PartialEq for AdapterConstructor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for AdapterConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConstructor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Capability check for one backend
#[derive(Debug, Clone, Copy)]
pub struct AdapterProbe {
    pub backend: Backend,
    /// Lower runs first
    pub priority: u32,
    pub recognizes: fn(&DatasetHandle) -> bool,
    pub constructor: AdapterConstructor,
}

fn is_arrow(handle: &DatasetHandle) -> bool {
    handle.is::<RecordBatch>() || handle.is::<Vec<RecordBatch>>()
}

fn is_json_records(handle: &DatasetHandle) -> bool {
    handle.is::<Vec<Record>>()
}

fn is_distributed(handle: &DatasetHandle) -> bool {
    handle.is::<DistributedFrame>()
}

fn is_connector(handle: &DatasetHandle) -> bool {
    handle.is::<Connector>()
}

fn is_cloud(handle: &DatasetHandle) -> bool {
    handle.is::<String>()
}

/// Probes for every built-in backend, in default priority order
pub fn builtin_probes() -> Vec<AdapterProbe> {
    vec![
        AdapterProbe {
            backend: Backend::Arrow,
            priority: 10,
            recognizes: is_arrow,
            constructor: AdapterConstructor {
                name: "arrow",
                kind: DatasetKind::EmbeddedColumnar,
                build: ArrowBatchAdapter::from_handle,
            },
        },
        AdapterProbe {
            backend: Backend::JsonRecords,
            priority: 20,
            recognizes: is_json_records,
            constructor: AdapterConstructor {
                name: "json_records",
                kind: DatasetKind::EmbeddedColumnar,
                build: JsonRecordsAdapter::from_handle,
            },
        },
        AdapterProbe {
            backend: Backend::Distributed,
            priority: 30,
            recognizes: is_distributed,
            constructor: AdapterConstructor {
                name: "distributed",
                kind: DatasetKind::DistributedColumnar,
                build: DistributedFrameAdapter::from_handle,
            },
        },
        AdapterProbe {
            backend: Backend::Connector,
            priority: 40,
            recognizes: is_connector,
            constructor: AdapterConstructor {
                name: "connector",
                kind: DatasetKind::DatabaseConnector,
                build: DatabaseConnectorAdapter::from_handle,
            },
        },
        AdapterProbe {
            backend: Backend::Cloud,
            priority: 50,
            recognizes: is_cloud,
            constructor: AdapterConstructor {
                name: "cloud",
                kind: DatasetKind::CloudReference,
                build: CloudDatasetAdapter::from_handle,
            },
        },
    ]
}

/// Explicit registry of adapter probes plus the per-type resolution memo
pub struct AdapterRegistry {
    features: BackendFeatures,
    probes: Vec<AdapterProbe>,
    memo: RwLock<HashMap<TypeId, AdapterConstructor>>,
}

impl AdapterRegistry {
    /// Registry with every built-in backend allowed by `features`
    pub fn new(features: BackendFeatures) -> Self {
        let mut registry = Self::empty(features);
        for probe in builtin_probes() {
            registry.register(probe);
        }
        registry
    }

    pub fn empty(features: BackendFeatures) -> Self {
        Self {
            features,
            probes: Vec::new(),
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Add a probe. Earlier resolutions are forgotten since the new probe may win.
    pub fn register(&mut self, probe: AdapterProbe) {
        tracing::debug!(
            "Registering adapter probe '{}' (priority {})",
            probe.constructor.name,
            probe.priority
        );
        self.probes.push(probe);
        self.probes.sort_by_key(|probe| probe.priority);
        self.memo
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn features(&self) -> &BackendFeatures {
        &self.features
    }

    /// Find the constructor for a handle's concrete type
    pub fn resolve(&self, handle: &DatasetHandle) -> Result<AdapterConstructor, AppError> {
        let type_id = handle.type_id();

        if let Some(constructor) = self
            .memo
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&type_id)
        {
            return Ok(*constructor);
        }

        let probe = self
            .probes
            .iter()
            .filter(|probe| self.features.is_enabled(probe.backend))
            .find(|probe| (probe.recognizes)(handle))
            .ok_or_else(|| AppError::UnsupportedDatasetType(handle.type_name().to_string()))?;

        tracing::debug!(
            "Resolved {} to '{}' adapter",
            handle.type_name(),
            probe.constructor.name
        );
        self.memo
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(type_id, probe.constructor);

        Ok(probe.constructor)
    }

    /// Resolve and build in one step
    pub fn create_adapter(
        &self,
        handle: &DatasetHandle,
        options: &AdapterOptions,
    ) -> Result<Box<dyn DatasetAdapter>, AppError> {
        self.resolve(handle)?.build(handle, options)
    }

    #[cfg(test)]
    fn is_memoized(&self, type_id: TypeId) -> bool {
        self.memo
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&type_id)
    }

    #[cfg(test)]
    fn memo_len(&self) -> usize {
        self.memo
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new(BackendFeatures::all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![json!({"x": 1}).as_object().cloned().unwrap()]
    }

    #[test]
    fn test_resolution_is_memoized() {
        let registry = AdapterRegistry::default();
        let handle = DatasetHandle::new(records());

        let first = registry.resolve(&handle).unwrap();
        let second = registry.resolve(&handle).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.name, "json_records");
        assert!(registry.is_memoized(TypeId::of::<Vec<Record>>()));
        assert_eq!(registry.memo_len(), 1);
    }

    #[test]
    fn test_unsupported_type_is_not_memoized() {
        let registry = AdapterRegistry::default();
        let handle = DatasetHandle::new(42_u32);

        let result = registry.resolve(&handle);
        match result {
            Err(AppError::UnsupportedDatasetType(name)) => assert!(name.contains("u32")),
            other => panic!("expected unsupported type, got {:?}", other.map(|c| c.name)),
        }
        assert_eq!(registry.memo_len(), 0);
    }

    #[test]
    fn test_disabled_backend_is_skipped() {
        let registry = AdapterRegistry::new(BackendFeatures::all().without(Backend::Cloud));
        let handle = DatasetHandle::new("ds-1".to_string());

        assert!(matches!(
            registry.resolve(&handle),
            Err(AppError::UnsupportedDatasetType(_))
        ));
    }

    #[test]
    fn test_custom_probe_takes_priority() {
        fn is_any_string(handle: &DatasetHandle) -> bool {
            handle.is::<String>()
        }

        let mut registry = AdapterRegistry::default();
        let handle = DatasetHandle::new("ds-1".to_string());
        assert_eq!(registry.resolve(&handle).unwrap().name, "cloud");

        registry.register(AdapterProbe {
            backend: Backend::Custom("named_file"),
            priority: 5,
            recognizes: is_any_string,
            constructor: AdapterConstructor {
                name: "named_file",
                kind: DatasetKind::CloudReference,
                build: CloudDatasetAdapter::from_handle,
            },
        });

        assert_eq!(registry.memo_len(), 0);
        assert_eq!(registry.resolve(&handle).unwrap().name, "named_file");
    }

    #[test]
    fn test_create_adapter_builds_matching_kind() {
        let registry = AdapterRegistry::default();
        let adapter = registry
            .create_adapter(&DatasetHandle::new(records()), &AdapterOptions::default())
            .unwrap();
        assert_eq!(adapter.dataset_kind(), DatasetKind::EmbeddedColumnar);
    }

    #[test]
    fn test_features_from_names() {
        let features = BackendFeatures::from_names(&["arrow", "json"]).unwrap();
        assert!(features.is_enabled(Backend::Arrow));
        assert!(features.is_enabled(Backend::JsonRecords));
        assert!(!features.is_enabled(Backend::Distributed));

        let empty: [&str; 0] = [];
        assert_eq!(BackendFeatures::from_names(&empty).unwrap(), BackendFeatures::all());
        assert!(BackendFeatures::from_names(&["nope"]).is_err());
    }
}
