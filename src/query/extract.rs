//! Request-filter extraction: free text to [`FilterIntent`].
//!
//! A fixed, ordered list of independent pattern rules over the raw text.
//! Rules do not share state; each contributes an optional partial update
//! to the intent, and a rule that does not match simply leaves its field
//! at the default. All matching is case-insensitive and best-effort.

use crate::query::intent::{FilterIntent, FilterValue};
use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Tokens never treated as a column name by the equality rule.
const RESERVED_KEYWORDS: &[&str] = &["from", "select", "where", "limit", "order", "group", "by"];

static SELECT_COLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)select\s+([a-zA-Z0-9_*]+(?:\s*,\s*[a-zA-Z0-9_*]+)*)\s+from").unwrap()
});

static IN_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-zA-Z0-9_]+)\s+in\s*\(([^)]+)\)").unwrap());

static EQUALITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-zA-Z0-9_]+)\s*=\s*([^\s,)]+)").unwrap());

static LIKE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)([a-zA-Z0-9_]+)\s+like\s*['"]([^'"]+)['"]"#).unwrap());

static DATE_BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-zA-Z0-9_]+)\s+between\s+['"]([^'"]+)['"]\s+and\s+['"]([^'"]+)['"]"#)
        .unwrap()
});

static LAST_N_DAYS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)last\s+(\d+)\s+days").unwrap());

static THIS_WEEK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)this\s+week").unwrap());

static THIS_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)this\s+month").unwrap());

static ORDER_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)order\s+by\s+([a-zA-Z0-9_]+(?:\s*,\s*[a-zA-Z0-9_]+)*)(?:\s+(asc|desc))?")
        .unwrap()
});

static GROUP_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)group\s+by\s+([a-zA-Z0-9_]+(?:\s*,\s*[a-zA-Z0-9_]+)*)").unwrap()
});

static LIMIT_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)limit\s+(\d+)").unwrap());

static TOP_N: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:top|first)\s+(\d+)").unwrap());

/// Extract a [`FilterIntent`] from free text, relative to the local date.
pub fn extract_filter_intent(user_text: &str) -> FilterIntent {
    extract_filter_intent_at(user_text, Local::now().date_naive())
}

/// Extraction with an injected "today", so date-relative rules are
/// deterministic under test.
pub fn extract_filter_intent_at(user_text: &str, today: NaiveDate) -> FilterIntent {
    let mut intent = FilterIntent::new();

    // Column list: `select <cols> from`, dropping the wildcard token.
    if let Some(caps) = SELECT_COLS.captures(user_text) {
        intent.columns = caps[1]
            .split(',')
            .map(str::trim)
            .filter(|col| !col.is_empty() && *col != "*")
            .map(String::from)
            .collect();
        debug!("Extracted columns: {:?}", intent.columns);
    }

    // Set-membership filters: `col in (a, b, c)`.
    for caps in IN_CLAUSE.captures_iter(user_text) {
        let col = caps[1].trim().to_lowercase();
        let values: Vec<String> = caps[2]
            .split(',')
            .map(|v| unquote(v.trim()).to_string())
            .filter(|v| !v.is_empty())
            .collect();
        debug!("Extracted IN filter for column {}: {:?}", col, values);
        intent.push_filter(col, FilterValue::OneOf(values));
    }

    // Equality filters: `col = value`, skipping SQL keywords. IN-clause
    // values take precedence over an equality match on the same column.
    for caps in EQUALITY.captures_iter(user_text) {
        let col = caps[1].trim().to_lowercase();
        if RESERVED_KEYWORDS.contains(&col.as_str()) {
            continue;
        }
        if intent.has_filter(&col) {
            continue;
        }
        let value = unquote(caps[2].trim()).to_string();
        debug!("Extracted equality filter for column {}: {}", col, value);
        intent.push_filter(col, FilterValue::Equals(value));
    }

    // Pattern filters: `col like 'pattern'`, stored under `<col>_like`.
    for caps in LIKE_PATTERN.captures_iter(user_text) {
        let col = caps[1].trim().to_lowercase();
        let pattern = caps[2].trim().to_string();
        debug!("Extracted LIKE filter for column {}: {}", col, pattern);
        intent.push_filter(format!("{}_like", col), FilterValue::Like(pattern));
    }

    // Date range: first matching rule wins; later rules are not tried.
    if let Some(caps) = DATE_BETWEEN.captures(user_text) {
        intent.start_date = Some(caps[2].trim().to_string());
        intent.end_date = Some(caps[3].trim().to_string());
    } else if let Some(caps) = LAST_N_DAYS.captures(user_text) {
        if let Ok(n) = caps[1].parse::<i64>() {
            intent.start_date = Some((today - Duration::days(n)).to_string());
            intent.end_date = Some(today.to_string());
        }
    } else if THIS_WEEK.is_match(user_text) {
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        intent.start_date = Some(monday.to_string());
        intent.end_date = Some(today.to_string());
    } else if THIS_MONTH.is_match(user_text) {
        let first = today.with_day(1).unwrap_or(today);
        intent.start_date = Some(first.to_string());
        intent.end_date = Some(today.to_string());
    }

    // Ordering: `order by <cols> [asc|desc]`, ascending when omitted.
    if let Some(caps) = ORDER_BY.captures(user_text) {
        let cols = caps[1].trim();
        let direction = caps
            .get(2)
            .map(|d| d.as_str().to_uppercase())
            .unwrap_or_else(|| "ASC".to_string());
        intent.order_by = Some(format!("{} {}", cols, direction));
        debug!("Extracted ORDER BY: {:?}", intent.order_by);
    }

    // Grouping: `group by <cols>`.
    if let Some(caps) = GROUP_BY.captures(user_text) {
        intent.group_by = caps[1]
            .split(',')
            .map(str::trim)
            .filter(|col| !col.is_empty())
            .map(String::from)
            .collect();
        debug!("Extracted GROUP BY: {:?}", intent.group_by);
    }

    intent
}

/// Parse an explicit row limit (`limit 20`, `top 5`, `first 5`) out of the
/// request text. Capped at 100.
pub fn parse_limit_from_text(user_text: &str) -> Option<u32> {
    let caps = LIMIT_CLAUSE
        .captures(user_text)
        .or_else(|| TOP_N.captures(user_text))?;
    caps[1].parse::<u32>().ok().map(|n| n.min(100))
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '\'' || c == '"')
}
