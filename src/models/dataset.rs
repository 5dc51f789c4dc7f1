// Dataset kind and record models
//
// A dataset kind classifies how an adapter's data is executed; a record is one
// result row keyed by column name.

use serde::{Deserialize, Serialize};

/// One result row as a column name -> value mapping, in result column order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Execution model of a dataset adapter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// In-process columnar data, queried through the embedded engine
    EmbeddedColumnar,
    /// Frames living on a distributed compute engine
    DistributedColumnar,
    /// Remote database reached through a connector
    DatabaseConnector,
    /// Opaque reference to a dataset stored in the cloud
    CloudReference,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::EmbeddedColumnar => "embedded_columnar",
            DatasetKind::DistributedColumnar => "distributed_columnar",
            DatasetKind::DatabaseConnector => "database_connector",
            DatasetKind::CloudReference => "cloud_reference",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
