// Field inference
//
// Derives raw fields and field metadata from an Arrow schema, then applies
// caller-supplied field specs on top.

use datafusion::arrow::datatypes::{DataType, Schema};

use crate::models::{AnalyticType, FieldMeta, FieldSpec, RawField, SemanticType};

/// Fields of one dataset, computed once at adapter construction
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    pub raw: Vec<RawField>,
    pub metas: Vec<FieldMeta>,
}

impl FieldSet {
    /// Infer from an Arrow schema
    pub fn from_schema(schema: &Schema, specs: &[FieldSpec]) -> Self {
        let mut set = FieldSet::default();

        for field in schema.fields() {
            let (semantic_type, analytic_type) = infer_roles(field.data_type());
            set.push(field.name(), field.data_type().to_string(), semantic_type, analytic_type, specs);
        }

        set
    }

    /// Build from field specs alone, for backends whose schema is not local
    pub fn from_specs(specs: &[FieldSpec]) -> Self {
        let mut set = FieldSet::default();

        for spec in specs {
            let semantic_type = spec.semantic_type.unwrap_or(SemanticType::Nominal);
            let analytic_type = spec.analytic_type.unwrap_or(match semantic_type {
                SemanticType::Quantitative => AnalyticType::Measure,
                _ => AnalyticType::Dimension,
            });
            set.push(&spec.fname, "Unknown".to_string(), semantic_type, analytic_type, specs);
        }

        set
    }

    fn push(
        &mut self,
        fid: &str,
        data_type: String,
        semantic_type: SemanticType,
        analytic_type: AnalyticType,
        specs: &[FieldSpec],
    ) {
        let spec = specs.iter().find(|spec| spec.fname == fid);
        let semantic_type = spec.and_then(|s| s.semantic_type).unwrap_or(semantic_type);
        let analytic_type = spec.and_then(|s| s.analytic_type).unwrap_or(analytic_type);
        let name = spec
            .and_then(|s| s.display_as.clone())
            .unwrap_or_else(|| fid.to_string());

        self.raw.push(RawField {
            fid: fid.to_string(),
            name,
            semantic_type,
            analytic_type,
            dataset: None,
        });
        self.metas.push(FieldMeta {
            fid: fid.to_string(),
            data_type,
            semantic_type,
            analytic_type,
        });
    }
}

/// Default roles for an Arrow type
pub fn infer_roles(data_type: &DataType) -> (SemanticType, AnalyticType) {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float16
        | DataType::Float32
        | DataType::Float64
        | DataType::Decimal128(_, _)
        | DataType::Decimal256(_, _) => (SemanticType::Quantitative, AnalyticType::Measure),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            (SemanticType::Temporal, AnalyticType::Dimension)
        }
        _ => (SemanticType::Nominal, AnalyticType::Dimension),
    }
}
