// Payload-to-SQL Translator
//
// Turns a visual query payload into one canonical SQL statement. The target
// dataset is exposed as a CTE named after the virtual view so the generated
// statement always reads from the same relation name. Output depends only on
// the inputs.

use chrono::DateTime;
use serde_json::Value;

use crate::api::middleware::AppError;
use crate::models::{
    AggregateOp, DataQueryPayload, FieldCatalog, FieldMeta, FilterField, FilterRule, Measure,
    SemanticType, SortDirection, ViewQuery, WorkflowStep,
};

/// Relation name payload queries read from
pub const VIRTUAL_VIEW_NAME: &str = "pygwalker_view";

/// Quote an identifier for the canonical dialect
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for the canonical dialect
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub struct PayloadSqlTranslator;

impl PayloadSqlTranslator {
    pub fn translate(
        view_name: &str,
        payload: &DataQueryPayload,
        catalog: &FieldCatalog,
    ) -> Result<String, AppError> {
        let dataset = match payload.dataset.as_deref() {
            Some(name) => name,
            None => catalog
                .primary()
                .ok_or_else(|| translation("dataset", "no dataset is registered"))?,
        };
        let metas = catalog
            .get(dataset)
            .ok_or_else(|| translation("dataset", format!("unknown dataset '{}'", dataset)))?;
        let fields = FieldLookup { metas };

        let mut filters: Vec<&FilterField> = Vec::new();
        let mut views: Vec<&ViewQuery> = Vec::new();
        let mut sorts: Vec<(&str, SortDirection)> = Vec::new();
        for step in &payload.workflow {
            match step {
                WorkflowStep::Filter { filters: step_filters } => filters.extend(step_filters),
                WorkflowStep::View { query } => views.extend(query),
                WorkflowStep::Sort { by, sort } => {
                    sorts.extend(by.iter().map(|key| (key.as_str(), *sort)))
                }
            }
        }

        let view = match views.as_slice() {
            [view] => *view,
            [] => return Err(translation("view", "payload has no view query")),
            _ => {
                return Err(translation(
                    "view",
                    format!("expected one view query, found {}", views.len()),
                ))
            }
        };

        let (select_list, group_by, output_columns) = build_view(view, &fields)?;

        let mut sql = format!(
            "WITH {view} AS (SELECT * FROM {source}) SELECT {select} FROM {view}",
            view = quote_ident(view_name),
            source = quote_ident(dataset),
            select = select_list,
        );

        if !filters.is_empty() {
            let conditions = filters
                .iter()
                .map(|filter| build_filter(filter, &fields))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }

        if !sorts.is_empty() {
            let keys = sorts
                .iter()
                .map(|(key, direction)| {
                    if !output_columns.iter().any(|column| column.as_str() == *key) {
                        return Err(translation(
                            "sort",
                            format!("sort key '{}' is not an output column", key),
                        ));
                    }
                    let direction = match direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    Ok(format!("{} {}", quote_ident(key), direction))
                })
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = payload.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = payload.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        tracing::debug!("Translated payload for dataset '{}': {}", dataset, sql);
        Ok(sql)
    }
}

fn translation(clause: &str, message: impl Into<String>) -> AppError {
    AppError::Translation(format!("{}: {}", clause, message.into()))
}

struct FieldLookup<'a> {
    metas: &'a [FieldMeta],
}

impl<'a> FieldLookup<'a> {
    fn get(&self, clause: &str, fid: &str) -> Result<&'a FieldMeta, AppError> {
        self.metas
            .iter()
            .find(|meta| meta.fid == fid)
            .ok_or_else(|| translation(clause, format!("unknown field '{}'", fid)))
    }

    fn all(&self) -> Vec<String> {
        self.metas.iter().map(|meta| meta.fid.clone()).collect()
    }
}

/// Select list, GROUP BY keys and output column names of a view query
fn build_view(
    view: &ViewQuery,
    fields: &FieldLookup<'_>,
) -> Result<(String, Vec<String>, Vec<String>), AppError> {
    match view {
        ViewQuery::Raw { fields: columns } => {
            if columns.is_empty() || columns.iter().any(|column| column == "*") {
                return Ok(("*".to_string(), Vec::new(), fields.all()));
            }

            let quoted = columns
                .iter()
                .map(|column| fields.get("view", column).map(|meta| quote_ident(&meta.fid)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((quoted.join(", "), Vec::new(), columns.clone()))
        }
        ViewQuery::Aggregate { group_by, measures } => {
            if group_by.is_empty() && measures.is_empty() {
                return Err(translation("view", "aggregate query selects no columns"));
            }

            let mut select = Vec::with_capacity(group_by.len() + measures.len());
            let mut keys = Vec::with_capacity(group_by.len());
            let mut output = Vec::with_capacity(group_by.len() + measures.len());

            for fid in group_by {
                let quoted = quote_ident(&fields.get("group by", fid)?.fid);
                select.push(quoted.clone());
                keys.push(quoted);
                output.push(fid.clone());
            }

            for measure in measures {
                if output.contains(&measure.as_field_key) {
                    return Err(translation(
                        "view",
                        format!("duplicate output column '{}'", measure.as_field_key),
                    ));
                }
                select.push(format!(
                    "{} AS {}",
                    aggregate_expr(measure, fields)?,
                    quote_ident(&measure.as_field_key)
                ));
                output.push(measure.as_field_key.clone());
            }

            Ok((select.join(", "), keys, output))
        }
    }
}

fn aggregate_expr(measure: &Measure, fields: &FieldLookup<'_>) -> Result<String, AppError> {
    if measure.field == "*" {
        return match measure.agg {
            AggregateOp::Count => Ok("COUNT(*)".to_string()),
            other => Err(translation(
                "view",
                format!("'*' can only be counted, not aggregated with {:?}", other),
            )),
        };
    }

    let column = quote_ident(&fields.get("view", &measure.field)?.fid);
    let expr = match measure.agg {
        AggregateOp::Sum => format!("SUM({})", column),
        AggregateOp::Count => format!("COUNT({})", column),
        AggregateOp::Mean => format!("AVG({})", column),
        AggregateOp::Median => format!("MEDIAN({})", column),
        AggregateOp::Min => format!("MIN({})", column),
        AggregateOp::Max => format!("MAX({})", column),
        AggregateOp::Variance => format!("VAR_SAMP({})", column),
        AggregateOp::Stdev => format!("STDDEV_SAMP({})", column),
        AggregateOp::DistinctCount => format!("COUNT(DISTINCT {})", column),
    };
    Ok(expr)
}

fn build_filter(filter: &FilterField, fields: &FieldLookup<'_>) -> Result<String, AppError> {
    let meta = fields.get("filter", &filter.fid)?;
    let column = quote_ident(&meta.fid);

    let condition = match &filter.rule {
        FilterRule::Range { value: (low, high) } => match (low, high) {
            (Some(low), Some(high)) => format!(
                "{} BETWEEN {} AND {}",
                column,
                number_literal(*low)?,
                number_literal(*high)?
            ),
            (Some(low), None) => format!("{} >= {}", column, number_literal(*low)?),
            (None, Some(high)) => format!("{} <= {}", column, number_literal(*high)?),
            (None, None) => "TRUE".to_string(),
        },
        FilterRule::TemporalRange { value: (start, end) } => {
            if meta.semantic_type != SemanticType::Temporal {
                return Err(translation(
                    "filter",
                    format!("temporal range on non-temporal field '{}'", meta.fid),
                ));
            }
            format!(
                "{} BETWEEN {} AND {}",
                column,
                timestamp_literal(*start)?,
                timestamp_literal(*end)?
            )
        }
        FilterRule::OneOf { value } => {
            let (literals, has_null) = value_literals(value)?;
            match (literals.is_empty(), has_null) {
                (true, false) => "FALSE".to_string(),
                (true, true) => format!("{} IS NULL", column),
                (false, false) => format!("{} IN ({})", column, literals.join(", ")),
                (false, true) => format!(
                    "({} IN ({}) OR {} IS NULL)",
                    column,
                    literals.join(", "),
                    column
                ),
            }
        }
        FilterRule::NotIn { value } => {
            let (literals, has_null) = value_literals(value)?;
            match (literals.is_empty(), has_null) {
                (true, false) => "TRUE".to_string(),
                (true, true) => format!("{} IS NOT NULL", column),
                (false, false) => format!(
                    "({} NOT IN ({}) OR {} IS NULL)",
                    column,
                    literals.join(", "),
                    column
                ),
                (false, true) => format!(
                    "({} NOT IN ({}) AND {} IS NOT NULL)",
                    column,
                    literals.join(", "),
                    column
                ),
            }
        }
        FilterRule::Regexp {
            value,
            case_sensitive,
        } => {
            let pattern = if *case_sensitive {
                value.clone()
            } else {
                format!("(?i){}", value)
            };
            format!("regexp_like({}, {})", column, quote_literal(&pattern))
        }
    };

    Ok(format!("({})", condition))
}

fn number_literal(value: f64) -> Result<String, AppError> {
    if !value.is_finite() {
        return Err(translation("filter", format!("range bound {} is not finite", value)));
    }
    Ok(value.to_string())
}

fn timestamp_literal(epoch_millis: i64) -> Result<String, AppError> {
    let at = DateTime::from_timestamp_millis(epoch_millis).ok_or_else(|| {
        translation(
            "filter",
            format!("timestamp {} is out of range", epoch_millis),
        )
    })?;
    Ok(format!(
        "CAST({} AS TIMESTAMP)",
        quote_literal(&at.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
    ))
}

/// SQL literals of a value list, plus whether the list contains null
fn value_literals(values: &[Value]) -> Result<(Vec<String>, bool), AppError> {
    let mut literals = Vec::with_capacity(values.len());
    let mut has_null = false;

    for value in values {
        match value {
            Value::Null => has_null = true,
            Value::Bool(b) => literals.push(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Value::Number(n) => literals.push(n.to_string()),
            Value::String(s) => literals.push(quote_literal(s)),
            other => {
                return Err(translation(
                    "filter",
                    format!("unsupported filter value {}", other),
                ))
            }
        }
    }

    Ok((literals, has_null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalyticType;
    use serde_json::json;

    fn meta(fid: &str, semantic_type: SemanticType) -> FieldMeta {
        FieldMeta {
            fid: fid.to_string(),
            data_type: "Utf8".to_string(),
            semantic_type,
            analytic_type: AnalyticType::Dimension,
        }
    }

    fn catalog() -> FieldCatalog {
        let mut catalog = FieldCatalog::new();
        catalog.insert(
            "sales",
            vec![
                meta("city", SemanticType::Nominal),
                meta("price", SemanticType::Quantitative),
                meta("sold_at", SemanticType::Temporal),
            ],
        );
        catalog.insert("returns", vec![meta("reason", SemanticType::Nominal)]);
        catalog
    }

    fn translate(payload: serde_json::Value) -> Result<String, AppError> {
        let payload = DataQueryPayload::from_value(payload)?;
        PayloadSqlTranslator::translate(VIRTUAL_VIEW_NAME, &payload, &catalog())
    }

    #[test]
    fn test_aggregate_with_sort_and_limit() {
        let sql = translate(json!({
            "workflow": [
                {"type": "view", "query": [{
                    "op": "aggregate",
                    "groupBy": ["city"],
                    "measures": [{"field": "price", "agg": "sum", "asFieldKey": "price_sum"}]
                }]},
                {"type": "sort", "by": ["price_sum"], "sort": "descending"}
            ],
            "limit": 10
        }))
        .unwrap();

        assert_eq!(
            sql,
            "WITH \"pygwalker_view\" AS (SELECT * FROM \"sales\") \
             SELECT \"city\", SUM(\"price\") AS \"price_sum\" FROM \"pygwalker_view\" \
             GROUP BY \"city\" ORDER BY \"price_sum\" DESC LIMIT 10"
        );
    }

    #[test]
    fn test_raw_view_with_filters() {
        let sql = translate(json!({
            "dataset": "sales",
            "workflow": [
                {"type": "filter", "filters": [
                    {"fid": "price", "rule": {"type": "range", "value": [1.5, null]}},
                    {"fid": "city", "rule": {"type": "one of", "value": ["O'Hare", null]}}
                ]},
                {"type": "view", "query": [{"op": "raw", "fields": ["city", "price"]}]}
            ],
            "offset": 5
        }))
        .unwrap();

        assert_eq!(
            sql,
            "WITH \"pygwalker_view\" AS (SELECT * FROM \"sales\") \
             SELECT \"city\", \"price\" FROM \"pygwalker_view\" \
             WHERE (\"price\" >= 1.5) AND ((\"city\" IN ('O''Hare') OR \"city\" IS NULL)) OFFSET 5"
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let payload = json!({
            "workflow": [
                {"type": "filter", "filters": [
                    {"fid": "city", "rule": {"type": "not in", "value": ["a", "b"]}}
                ]},
                {"type": "view", "query": [{
                    "op": "aggregate",
                    "groupBy": ["city"],
                    "measures": [
                        {"field": "*", "agg": "count", "asFieldKey": "n"},
                        {"field": "price", "agg": "distinctCount", "asFieldKey": "prices"}
                    ]
                }]}
            ]
        });

        let first = translate(payload.clone()).unwrap();
        let second = translate(payload).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("COUNT(*) AS \"n\""));
        assert!(first.contains("COUNT(DISTINCT \"price\") AS \"prices\""));
        assert!(first.contains("(\"city\" NOT IN ('a', 'b') OR \"city\" IS NULL)"));
    }

    #[test]
    fn test_temporal_range() {
        let sql = translate(json!({
            "workflow": [
                {"type": "filter", "filters": [
                    {"fid": "sold_at", "rule": {"type": "temporal range", "value": [0, 86400000]}}
                ]},
                {"type": "view", "query": [{"op": "raw", "fields": ["*"]}]}
            ]
        }))
        .unwrap();

        assert!(sql.contains(
            "(\"sold_at\" BETWEEN CAST('1970-01-01 00:00:00.000' AS TIMESTAMP) \
             AND CAST('1970-01-02 00:00:00.000' AS TIMESTAMP))"
        ));

        let err = translate(json!({
            "workflow": [
                {"type": "filter", "filters": [
                    {"fid": "city", "rule": {"type": "temporal range", "value": [0, 1]}}
                ]},
                {"type": "view", "query": [{"op": "raw", "fields": ["city"]}]}
            ]
        }))
        .unwrap_err();
        assert!(matches!(err, AppError::Translation(msg) if msg.starts_with("filter")));
    }

    #[test]
    fn test_case_insensitive_regexp() {
        let sql = translate(json!({
            "workflow": [
                {"type": "filter", "filters": [
                    {"fid": "city", "rule": {"type": "regexp", "value": "^os", "caseSensitive": false}}
                ]},
                {"type": "view", "query": [{"op": "raw", "fields": ["city"]}]}
            ]
        }))
        .unwrap();

        assert!(sql.contains("WHERE (regexp_like(\"city\", '(?i)^os'))"));
    }

    #[test]
    fn test_errors_name_the_clause() {
        let unknown_dataset = translate(json!({
            "dataset": "missing",
            "workflow": [{"type": "view", "query": [{"op": "raw", "fields": ["city"]}]}]
        }));
        assert!(matches!(unknown_dataset, Err(AppError::Translation(msg)) if msg.starts_with("dataset")));

        let no_view = translate(json!({"workflow": []}));
        assert!(matches!(no_view, Err(AppError::Translation(msg)) if msg.starts_with("view")));

        let unknown_field = translate(json!({
            "workflow": [{"type": "view", "query": [{"op": "raw", "fields": ["nope"]}]}]
        }));
        assert!(matches!(unknown_field, Err(AppError::Translation(msg)) if msg.contains("'nope'")));

        let bad_sort = translate(json!({
            "workflow": [
                {"type": "view", "query": [{"op": "raw", "fields": ["city"]}]},
                {"type": "sort", "by": ["price"], "sort": "ascending"}
            ]
        }));
        assert!(matches!(bad_sort, Err(AppError::Translation(msg)) if msg.starts_with("sort")));

        let malformed = translate(json!({"workflow": [{"type": "pivot"}]}));
        assert!(matches!(malformed, Err(AppError::Translation(_))));
    }

    #[test]
    fn test_targets_named_dataset() {
        let sql = translate(json!({
            "dataset": "returns",
            "workflow": [{"type": "view", "query": [{"op": "raw", "fields": ["reason"]}]}]
        }))
        .unwrap();
        assert!(sql.starts_with("WITH \"pygwalker_view\" AS (SELECT * FROM \"returns\")"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
