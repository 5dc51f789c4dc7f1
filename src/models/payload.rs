// Analytical Query Payload Model
//
// Structured description of a query (filters, aggregation, sort, limit) produced
// upstream by the visual exploration UI. The payload is independent of SQL syntax
// and is turned into a statement by the payload translator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::middleware::AppError;

/// Visual query payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryPayload {
    /// Registered dataset queried; the first registered dataset when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    /// Ordered workflow steps
    #[serde(default)]
    pub workflow: Vec<WorkflowStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl DataQueryPayload {
    /// Parse a payload from raw JSON, reporting the offending location on failure
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Translation(format!("malformed payload: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkflowStep {
    Filter { filters: Vec<FilterField> },
    View { query: Vec<ViewQuery> },
    Sort { by: Vec<String>, sort: SortDirection },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterField {
    pub fid: String,
    pub rule: FilterRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FilterRule {
    /// Inclusive numeric range; a missing bound is open
    #[serde(rename = "range")]
    Range { value: (Option<f64>, Option<f64>) },

    /// Inclusive range of epoch milliseconds
    #[serde(rename = "temporal range")]
    TemporalRange { value: (i64, i64) },

    #[serde(rename = "one of")]
    OneOf { value: Vec<Value> },

    #[serde(rename = "not in")]
    NotIn { value: Vec<Value> },

    #[serde(rename = "regexp", rename_all = "camelCase")]
    Regexp {
        value: String,
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
}

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ViewQuery {
    #[serde(rename_all = "camelCase")]
    Aggregate {
        group_by: Vec<String>,
        measures: Vec<Measure>,
    },
    Raw { fields: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Aggregated field; `*` counts rows
    pub field: String,
    pub agg: AggregateOp,
    pub as_field_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AggregateOp {
    Sum,
    Count,
    Mean,
    Median,
    Min,
    Max,
    Variance,
    Stdev,
    DistinctCount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}
