use serde::{Deserialize, Serialize};

/// Semantic (visual encoding) type of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Quantitative,
    Nominal,
    Ordinal,
    Temporal,
}

/// Analytic role of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticType {
    Dimension,
    Measure,
}

/// A field as exported to callers, optionally tagged with its owning dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    pub fid: String,
    pub name: String,
    pub semantic_type: SemanticType,
    pub analytic_type: AnalyticType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
}

impl RawField {
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }
}

/// Caller-supplied override for one field
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub fname: String,
    #[serde(default)]
    pub semantic_type: Option<SemanticType>,
    #[serde(default)]
    pub analytic_type: Option<AnalyticType>,
    #[serde(default)]
    pub display_as: Option<String>,
}

impl FieldSpec {
    pub fn new(fname: impl Into<String>) -> Self {
        Self {
            fname: fname.into(),
            ..Default::default()
        }
    }

    pub fn semantic(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = Some(semantic_type);
        self
    }

    pub fn analytic(mut self, analytic_type: AnalyticType) -> Self {
        self.analytic_type = Some(analytic_type);
        self
    }
}

/// Catalog entry consumed by the payload translator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldMeta {
    pub fid: String,
    /// Storage type as reported by the backend (e.g. "Int64", "Utf8")
    pub data_type: String,
    pub semantic_type: SemanticType,
    pub analytic_type: AnalyticType,
}

/// Field metadata of every dataset of a coordinator, in registry order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldCatalog {
    datasets: Vec<(String, Vec<FieldMeta>)>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: impl Into<String>, metas: Vec<FieldMeta>) {
        let dataset = dataset.into();
        match self.datasets.iter_mut().find(|(name, _)| *name == dataset) {
            Some(entry) => entry.1 = metas,
            None => self.datasets.push((dataset, metas)),
        }
    }

    pub fn get(&self, dataset: &str) -> Option<&[FieldMeta]> {
        self.datasets
            .iter()
            .find(|(name, _)| name == dataset)
            .map(|(_, metas)| metas.as_slice())
    }

    /// First registered dataset, the default query target
    pub fn primary(&self) -> Option<&str> {
        self.datasets.first().map(|(name, _)| name.as_str())
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|(name, _)| name.as_str())
    }
}
