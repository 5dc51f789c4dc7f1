// Backend adapters: one uniform capability view per dataset representation
pub mod adapter;
pub mod arrow;
pub mod cloud;
pub mod connector;
pub mod distributed;
pub mod fields;
pub mod handle;
pub mod json_records;

pub use adapter::{AdapterOptions, DatasetAdapter, ExecutionHook};
pub use arrow::ArrowBatchAdapter;
pub use cloud::CloudDatasetAdapter;
pub use connector::{Connector, DatabaseConnectorAdapter};
pub use distributed::{DistributedFrame, DistributedFrameAdapter, DistributedRow, DistributedSession};
pub use fields::FieldSet;
pub use handle::DatasetHandle;
pub use json_records::{records_to_batch, JsonRecordsAdapter};
