use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dataset::{DatasetKind, Record};
use super::field::RawField;

#[derive(Debug, Deserialize)]
pub struct SqlQueryRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchSqlQueryRequest {
    pub queries: Vec<String>,
}

/// Payloads arrive as raw JSON so malformed ones surface as translation errors
#[derive(Debug, Deserialize)]
pub struct PayloadQueryRequest {
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct BatchPayloadQueryRequest {
    pub payloads: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Export only this dataset
    pub dataset: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub records: Vec<Record>,
    pub row_count: usize,
}

impl QueryResponse {
    pub fn new(records: Vec<Record>) -> Self {
        let row_count = records.len();
        Self { records, row_count }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchQueryResponse {
    pub results: Vec<Vec<Record>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub data_size: usize,
    pub dataset_kind: DatasetKind,
    pub fields: Vec<RawField>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatasetRecordsResponse {
    pub records: BTreeMap<String, Vec<Record>>,
}
