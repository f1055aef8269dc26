//! Schema-aware SQL synthesis: [`FilterIntent`] + table metadata to a
//! parameterized [`QueryPlan`].

use crate::config::DATE_COLUMN_CANDIDATES;
use crate::database::{ParamValue, QueryParams, TableSchema};
use crate::error::QueryError;
use crate::query::intent::{FilterIntent, FilterValue};
use chrono::{Duration, Local, NaiveDate};
use tracing::debug;

/// Selected-column cap applied when the caller names no columns.
const MAX_AUTO_COLUMNS: usize = 12;

/// Row-count threshold above which the implicit date window activates.
const AUTO_WINDOW_ROW_THRESHOLD: u64 = 10_000;

/// Values coerced to boolean `1` for `is_`-prefixed integer columns.
const TRUTHY_VALUES: &[&str] = &["1", "true", "yes", "on", "y", "t"];

/// The synthesizer's output. Immutable once produced.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Full statement with `:name` placeholders and a literal LIMIT.
    pub sql: String,
    /// Bound values, one entry per placeholder.
    pub params: QueryParams,
    /// The individual WHERE predicates, for the cost estimator.
    pub where_conditions: Vec<String>,
    /// Human-readable notes for every heuristic applied on the caller's
    /// behalf. Append-only.
    pub auto_applied: Vec<String>,
}

/// Find the date column the implicit window would use: the first
/// candidate name present in the schema with a temporal normalized type.
pub fn find_date_column(schema: &TableSchema) -> Option<&str> {
    DATE_COLUMN_CANDIDATES.iter().copied().find(|candidate| {
        schema
            .get(candidate)
            .is_some_and(|column_type| column_type.is_temporal())
    })
}

/// Schema-aware SQL synthesizer.
pub struct SqlSynthesizer {
    window_days: i64,
    today: NaiveDate,
}

impl SqlSynthesizer {
    pub fn new(window_days: i64) -> Self {
        Self::with_today(window_days, Local::now().date_naive())
    }

    /// Construction with an injected "today" for deterministic tests.
    pub fn with_today(window_days: i64, today: NaiveDate) -> Self {
        Self { window_days, today }
    }

    /// Build a [`QueryPlan`] for `table`.
    ///
    /// The intent is mutated at most once: when the implicit date window
    /// activates, its bounds are written back so the caller sees what was
    /// actually queried.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoValidColumns`] when the intent names at
    /// least one column and none of them exist in the schema.
    pub fn synthesize(
        &self,
        table: &str,
        schema: &TableSchema,
        intent: &mut FilterIntent,
        limit: u32,
        row_count: u64,
    ) -> Result<QueryPlan, QueryError> {
        let mut auto_applied = Vec::new();

        let columns: Vec<String> = if intent.columns.is_empty() {
            let selected: Vec<String> = schema
                .column_names()
                .take(MAX_AUTO_COLUMNS)
                .map(String::from)
                .collect();
            if schema.len() > MAX_AUTO_COLUMNS {
                auto_applied.push("column_limit".to_string());
            }
            selected
        } else {
            let valid: Vec<String> = intent
                .columns
                .iter()
                .filter(|col| schema.contains(col))
                .map(|col| col.to_lowercase())
                .collect();
            if valid.is_empty() {
                return Err(QueryError::NoValidColumns);
            }
            valid
        };

        let date_column = find_date_column(schema);

        // Implicit trailing window: protects the caller from scanning an
        // unbounded historical table when no explicit range was given.
        if !intent.has_date_range()
            && intent.start_date.is_none()
            && intent.end_date.is_none()
            && date_column.is_some()
            && row_count > AUTO_WINDOW_ROW_THRESHOLD
        {
            let end = self.today;
            let start = end - Duration::days(self.window_days);
            intent.start_date = Some(start.to_string());
            intent.end_date = Some(end.to_string());
            auto_applied.push(format!("auto date window {} to {}", start, end));
            debug!("Applied implicit date window {} to {}", start, end);
        }

        let (where_conditions, params) = build_where_clause(
            &intent.filters,
            schema,
            intent.start_date.as_deref(),
            intent.end_date.as_deref(),
            date_column,
        );

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table);

        if !where_conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_conditions.join(" AND "));
        }

        let valid_group_by: Vec<&str> = intent
            .group_by
            .iter()
            .filter(|col| schema.contains(col))
            .map(String::as_str)
            .collect();
        let grouped = !valid_group_by.is_empty();
        if grouped {
            sql.push_str(" GROUP BY ");
            sql.push_str(&valid_group_by.join(", "));
        }

        if let Some(order_by) = intent.order_by.as_deref() {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        } else if !grouped {
            // Deterministic, pagination-friendly default.
            sql.push_str(" ORDER BY ");
            sql.push_str(&columns[0]);
        }

        sql.push_str(&format!(" LIMIT {}", limit));

        Ok(QueryPlan {
            sql,
            params,
            where_conditions,
            auto_applied,
        })
    }
}

/// Build WHERE predicates and their bound parameters, in the fixed
/// emission order: date range, pattern filters, set-membership filters,
/// equality filters. Filter keys absent from the schema are silently
/// dropped.
fn build_where_clause(
    filters: &[(String, FilterValue)],
    schema: &TableSchema,
    start_date: Option<&str>,
    end_date: Option<&str>,
    date_column: Option<&str>,
) -> (Vec<String>, QueryParams) {
    let mut conditions = Vec::new();
    let mut params = QueryParams::new();
    let mut counter = 1usize;

    if let (Some(start), Some(end), Some(date_col)) = (start_date, end_date, date_column) {
        conditions.push(format!("{} BETWEEN :start_date AND :end_date", date_col));
        params.insert("start_date".into(), ParamValue::Text(start.to_string()));
        params.insert("end_date".into(), ParamValue::Text(end.to_string()));
    }

    // Pattern filters match against every schema column ("search
    // anywhere" semantics), one fresh placeholder per column.
    for (_, value) in filters {
        if let FilterValue::Like(pattern) = value {
            for col in schema.column_names() {
                let name = format!("param{}", counter);
                conditions.push(format!("{} LIKE :{}", col, name));
                params.insert(name, ParamValue::Text(pattern.clone()));
                counter += 1;
            }
        }
    }

    for (key, value) in filters {
        if let FilterValue::OneOf(values) = value {
            if !schema.contains(key) {
                continue;
            }
            let base = format!("param{}", counter);
            let placeholders: Vec<String> = (0..values.len())
                .map(|i| format!(":{}_{}", base, i))
                .collect();
            conditions.push(format!("{} IN ({})", key, placeholders.join(", ")));
            for (i, v) in values.iter().enumerate() {
                params.insert(format!("{}_{}", base, i), ParamValue::Text(v.clone()));
            }
            counter += 1;
        }
    }

    for (key, value) in filters {
        if let FilterValue::Equals(raw) = value {
            let Some(column_type) = schema.get(key) else {
                continue;
            };
            let name = format!("param{}", counter);
            conditions.push(format!("{} = :{}", key, name));
            // Boolean-shaped integer columns get a truthy-string coercion.
            let bound = if column_type.is_integer_like() && key.starts_with("is_") {
                let truthy = TRUTHY_VALUES.contains(&raw.to_lowercase().as_str());
                ParamValue::Int(if truthy { 1 } else { 0 })
            } else {
                ParamValue::Text(raw.clone())
            };
            params.insert(name, bound);
            counter += 1;
        }
    }

    (conditions, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ColumnType;
    use crate::query::extract::extract_filter_intent_at;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    fn synthesizer() -> SqlSynthesizer {
        SqlSynthesizer::with_today(365, today())
    }

    fn orders_schema() -> TableSchema {
        [
            ("id".to_string(), ColumnType::Integer),
            ("customer".to_string(), ColumnType::Text),
            ("total".to_string(), ColumnType::Real),
            ("is_paid".to_string(), ColumnType::Integer),
            ("created_at".to_string(), ColumnType::DateTime),
        ]
        .into_iter()
        .collect()
    }

    fn wide_schema(n: usize) -> TableSchema {
        (0..n)
            .map(|i| (format!("col{:02}", i), ColumnType::Text))
            .collect()
    }

    #[test]
    fn test_selects_requested_columns_in_caller_order() {
        let schema = orders_schema();
        let mut intent = FilterIntent {
            columns: vec!["total".into(), "ID".into()],
            ..Default::default()
        };
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert!(plan.sql.starts_with("SELECT total, id FROM orders"));
    }

    #[test]
    fn test_no_valid_columns_fails() {
        let schema = orders_schema();
        let mut intent = FilterIntent {
            columns: vec!["ghost".into(), "phantom".into()],
            ..Default::default()
        };
        let err = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap_err();
        assert!(matches!(err, QueryError::NoValidColumns));
    }

    #[test]
    fn test_column_cap_and_note() {
        let schema = wide_schema(15);
        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("wide", &schema, &mut intent, 10, 100)
            .unwrap();

        assert!(plan.auto_applied.contains(&"column_limit".to_string()));
        // 12 columns selected, not 15.
        let select_list = plan.sql.strip_prefix("SELECT ").unwrap();
        let select_list = select_list.split(" FROM").next().unwrap();
        assert_eq!(select_list.split(", ").count(), 12);
    }

    #[test]
    fn test_no_column_cap_note_for_narrow_schema() {
        let schema = wide_schema(12);
        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("wide", &schema, &mut intent, 10, 100)
            .unwrap();
        assert!(plan.auto_applied.is_empty());
    }

    #[test]
    fn test_auto_window_activates_above_threshold() {
        let schema = orders_schema();
        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 50_000)
            .unwrap();

        // 365-day window ending today, written back into the intent.
        assert_eq!(intent.start_date.as_deref(), Some("2023-06-13"));
        assert_eq!(intent.end_date.as_deref(), Some("2024-06-12"));
        assert!(plan.sql.contains("created_at BETWEEN :start_date AND :end_date"));
        assert!(
            plan.auto_applied
                .contains(&"auto date window 2023-06-13 to 2024-06-12".to_string())
        );
    }

    #[test]
    fn test_auto_window_never_activates_at_or_below_threshold() {
        let schema = orders_schema();
        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 10_000)
            .unwrap();
        assert!(!plan.sql.contains("BETWEEN"));
        assert!(plan.auto_applied.is_empty());
        assert!(intent.start_date.is_none());
    }

    #[test]
    fn test_auto_window_skipped_without_temporal_column() {
        let mut schema = wide_schema(3);
        // A candidate name with a non-temporal type does not qualify.
        schema.push("date", ColumnType::Text);
        assert_eq!(find_date_column(&schema), None);

        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("wide", &schema, &mut intent, 10, 50_000)
            .unwrap();
        assert!(plan.auto_applied.is_empty());
    }

    #[test]
    fn test_explicit_range_wins_over_auto_window() {
        // Scenario: 50k-row orders table, "orders last 30 days".
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("orders last 30 days", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 100, 50_000)
            .unwrap();

        assert!(plan.sql.contains("BETWEEN :start_date AND :end_date"));
        assert!(!plan.auto_applied.iter().any(|n| n.starts_with("auto date window")));
        assert_eq!(
            plan.params.get("start_date"),
            Some(&ParamValue::Text("2024-05-13".into()))
        );
    }

    #[test]
    fn test_like_matches_every_schema_column() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("customer like '%smith%'", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();

        // One LIKE predicate per schema column, not just `customer`.
        let like_count = plan
            .where_conditions
            .iter()
            .filter(|c| c.contains("LIKE"))
            .count();
        assert_eq!(like_count, schema.len());
        assert_eq!(plan.params.len(), schema.len());
    }

    #[test]
    fn test_in_filter_expands_placeholders() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("customer in ('ada', 'grace')", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();

        assert!(plan.sql.contains("customer IN (:param1_0, :param1_1)"));
        assert_eq!(plan.params.get("param1_0"), Some(&ParamValue::Text("ada".into())));
        assert_eq!(plan.params.get("param1_1"), Some(&ParamValue::Text("grace".into())));
    }

    #[test]
    fn test_boolean_coercion_for_is_prefixed_integer_columns() {
        let schema = orders_schema();

        let mut intent = extract_filter_intent_at("is_paid = yes", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert_eq!(plan.params.get("param1"), Some(&ParamValue::Int(1)));

        let mut intent = extract_filter_intent_at("is_paid = nope", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert_eq!(plan.params.get("param1"), Some(&ParamValue::Int(0)));
    }

    #[test]
    fn test_unknown_filter_keys_are_dropped_silently() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("nonexistent = 5", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert!(plan.where_conditions.is_empty());
        assert!(plan.params.is_empty());
    }

    #[test]
    fn test_group_by_suppresses_default_ordering() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("group by customer", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert!(plan.sql.contains("GROUP BY customer"));
        assert!(!plan.sql.contains("ORDER BY"));
    }

    #[test]
    fn test_default_ordering_on_first_selected_column() {
        let schema = orders_schema();
        let mut intent = FilterIntent::new();
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 25, 100)
            .unwrap();
        assert!(plan.sql.ends_with("ORDER BY id LIMIT 25"));
    }

    #[test]
    fn test_explicit_order_by_is_verbatim() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at("order by total desc", today());
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 10, 100)
            .unwrap();
        assert!(plan.sql.contains("ORDER BY total DESC"));
    }

    #[test]
    fn test_clause_assembly_order() {
        let schema = orders_schema();
        let mut intent = extract_filter_intent_at(
            "customer = 'ada' group by customer order by customer asc",
            today(),
        );
        let plan = synthesizer()
            .synthesize("orders", &schema, &mut intent, 5, 100)
            .unwrap();

        let sql = &plan.sql;
        let select = sql.find("SELECT").unwrap();
        let where_pos = sql.find(" WHERE ").unwrap();
        let group = sql.find(" GROUP BY ").unwrap();
        let order = sql.find(" ORDER BY ").unwrap();
        let limit = sql.find(" LIMIT ").unwrap();
        assert!(select < where_pos && where_pos < group && group < order && order < limit);
    }
}
