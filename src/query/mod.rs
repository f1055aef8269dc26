//! Query-synthesis pipeline.
//!
//! Turns a loosely-structured free-text request into a parameterized
//! SQLite SELECT: extraction ([`extract`]), schema-aware synthesis
//! ([`synth`]), cost estimation ([`cost`]), sampling degradation
//! ([`sampling`]), all sequenced by the orchestrator ([`pipeline`]).

pub mod cost;
pub mod extract;
pub mod intent;
pub mod pipeline;
pub mod sampling;
pub mod synth;

pub use cost::estimate_rows;
pub use extract::{extract_filter_intent, parse_limit_from_text};
pub use intent::{FilterIntent, FilterValue};
pub use pipeline::{QueryPipeline, QueryRequest, ResponseEnvelope};
pub use sampling::apply_sampling;
pub use synth::{QueryPlan, SqlSynthesizer, find_date_column};
