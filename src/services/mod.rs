pub mod coordinator; // Multi-dataset façade
pub mod datafusion; // Embedded engine, result conversion, dialects
pub mod dataset; // Backend adapters
pub mod loader;
pub mod payload_sql;
pub mod query_router;
pub mod resolver;

pub use coordinator::*;
pub use dataset::{AdapterOptions, DatasetAdapter, DatasetHandle, ExecutionHook};
pub use loader::*;
pub use payload_sql::*;
pub use query_router::*;
pub use resolver::*;
