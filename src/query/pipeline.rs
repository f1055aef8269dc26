//! Pipeline orchestration: one request in, one response envelope out.
//!
//! The pipeline sequences extraction, synthesis, estimation and
//! execution, degrading to sampling when the estimate exceeds the row
//! budget. Every failure mode is folded into the envelope's `note`; the
//! pipeline itself never returns an error to the caller.

use crate::config::QueryConfig;
use crate::database::{QueryParams, Row, StorageBackend, normalize_table_ref};
use crate::error::{McpError, QueryError};
use crate::query::cost::estimate_rows;
use crate::query::extract::{extract_filter_intent, parse_limit_from_text};
use crate::query::sampling::apply_sampling;
use crate::query::synth::SqlSynthesizer;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Rows shown inline in the rendered envelope before eliding.
const MAX_RENDERED_ROWS: usize = 10;

static FROM_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)from\s+([a-zA-Z0-9_.]+)").unwrap());

/// A query request as received from the tool layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueryRequest {
    /// Free-text description of the desired query.
    pub user_text: String,
    /// Explicit table name; wins over any table mentioned in the text.
    #[serde(default)]
    pub table: Option<String>,
    /// Per-request override of the configured row budget.
    #[serde(default)]
    pub rows_budget: Option<u64>,
    /// Explicit result limit; wins over a limit parsed from the text.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Per-request database path override.
    #[serde(default)]
    pub db_path: Option<String>,
}

/// The pipeline's single output shape.
///
/// Success and failure share this type: a failed request carries a
/// `note` and whatever earlier stages produced, so the caller always
/// sees how far processing got.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponseEnvelope {
    /// The synthesized statement, or empty if synthesis never ran.
    pub sql_preview: String,
    /// Named parameters bound to the preview.
    pub params: QueryParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_rows: Option<u64>,
    /// Heuristics applied on the caller's behalf.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_applied: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_seconds: Option<f64>,
}

impl ResponseEnvelope {
    fn failed(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Default::default()
        }
    }

    /// Render the envelope as display text for the tool response.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.sql_preview.is_empty() {
            out.push_str("SQL Query:\n");
            out.push_str(&self.sql_preview);
            out.push('\n');
        }

        if !self.params.is_empty() {
            out.push_str("\nParameters:\n");
            for (name, value) in &self.params {
                out.push_str(&format!("  {} = {}\n", name, value));
            }
        }

        if !self.auto_applied.is_empty() {
            out.push_str("\nAuto Applied:\n");
            for note in &self.auto_applied {
                out.push_str(&format!("  - {}\n", note));
            }
        }

        if let Some(estimated) = self.estimated_rows {
            out.push_str(&format!("\nEstimated Rows: {}\n", estimated));
        }

        if let Some(rows) = &self.rows {
            out.push_str(&format!("\nRows ({}):\n", rows.len()));
            for row in rows.iter().take(MAX_RENDERED_ROWS) {
                // Via Value so keys render in sorted order.
                let json = serde_json::to_value(row)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| "{}".to_string());
                out.push_str(&json);
                out.push('\n');
            }
            if rows.len() > MAX_RENDERED_ROWS {
                out.push_str(&format!("... and {} more\n", rows.len() - MAX_RENDERED_ROWS));
            }
        }

        if let Some(note) = &self.note {
            out.push_str(&format!("\nNote: {}\n", note));
        }

        if let Some(secs) = self.execution_time_seconds {
            out.push_str(&format!("\nExecution Time: {:.3}s\n", secs));
        }

        out.trim().to_string()
    }
}

/// Orchestrates one request through extraction, synthesis, estimation
/// and execution against a storage backend.
pub struct QueryPipeline {
    store: Arc<dyn StorageBackend>,
    config: QueryConfig,
}

impl QueryPipeline {
    pub fn new(store: Arc<dyn StorageBackend>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    /// Process a request end to end. Infallible by construction: every
    /// error path collapses into an envelope with a `note`.
    pub async fn process(&self, request: &QueryRequest) -> ResponseEnvelope {
        match self.run(request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Query pipeline failed: {}", e);
                ResponseEnvelope::failed(format!("Error processing request: {}", e))
            }
        }
    }

    async fn run(&self, request: &QueryRequest) -> Result<ResponseEnvelope, McpError> {
        let table = resolve_table(request)?;

        if !self.store.table_exists(&table).await? {
            return Ok(ResponseEnvelope::failed(format!(
                "Table '{}' does not exist.",
                table
            )));
        }

        let schema = self.store.table_schema(&table).await?;
        let row_count = self.store.row_count(&table).await?;

        let mut intent = extract_filter_intent(&request.user_text);
        let limit = request
            .limit
            .or_else(|| parse_limit_from_text(&request.user_text))
            .unwrap_or(self.config.default_limit);

        let synthesizer = SqlSynthesizer::new(self.config.default_window_days);
        let plan = synthesizer.synthesize(&table, &schema, &mut intent, limit, row_count)?;

        let estimated = estimate_rows(&plan.where_conditions, row_count);
        let budget = request.rows_budget.unwrap_or(self.config.max_rows_budget);

        let mut envelope = ResponseEnvelope {
            sql_preview: plan.sql.clone(),
            params: plan.params.clone(),
            estimated_rows: Some(estimated),
            auto_applied: plan.auto_applied,
            ..Default::default()
        };

        let sql = if estimated <= budget {
            plan.sql
        } else {
            let sampled = (estimated as f64 * self.config.sampling_rate) as u64;
            if sampled > budget {
                // Even the sampled form blows the budget; refuse to run.
                let err = QueryError::OverBudget {
                    estimated_rows: estimated,
                    budget,
                };
                envelope.note = Some(err.to_string());
                return Ok(envelope);
            }
            info!(
                estimated,
                sampled, budget, "Estimate over budget, downgrading to sampling"
            );
            envelope.auto_applied.push("sampling".to_string());
            envelope.estimated_rows = Some(sampled);
            let sampled_sql = apply_sampling(&plan.sql, self.config.sampling_rate);
            envelope.sql_preview = sampled_sql.clone();
            sampled_sql
        };

        let started = Instant::now();
        match self.store.execute_query(&sql, &envelope.params).await {
            Ok(rows) => {
                envelope.execution_time_seconds = Some(started.elapsed().as_secs_f64());
                info!(
                    table = %table,
                    rows = rows.len(),
                    "Query executed"
                );
                envelope.rows = Some(rows);
            }
            Err(e) => {
                // Keep the preview and estimate so the caller can see
                // what was attempted.
                envelope.note = Some(format!("Error executing query: {}", e));
            }
        }

        Ok(envelope)
    }
}

/// Resolve the target table: explicit argument first, then a `from
/// <table>` mention in the text. Schema prefixes are stripped.
fn resolve_table(request: &QueryRequest) -> Result<String, QueryError> {
    let raw = request
        .table
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(String::from)
        .or_else(|| {
            FROM_TABLE
                .captures(&request.user_text)
                .map(|caps| caps[1].to_string())
        })
        .ok_or(QueryError::TableUnresolved)?;
    Ok(normalize_table_ref(&raw))
}
