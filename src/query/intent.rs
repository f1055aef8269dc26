//! Structured filter intent extracted from free text.

/// A single filter extracted from the request text.
///
/// `Like` entries are stored under a `<col>_like` key so a pattern match
/// and a plain equality/membership filter on the same column remain
/// distinct intents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// `col = value`
    Equals(String),
    /// `col IN (a, b, c)`
    OneOf(Vec<String>),
    /// `col LIKE 'pattern'`
    Like(String),
}

/// The structured result of parsing a free-text request.
///
/// Constructed fresh per request. The synthesizer may set the date
/// bounds once (the implicit window heuristic); nothing else mutates an
/// intent after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterIntent {
    /// Requested columns, in caller order; empty means "not specified".
    pub columns: Vec<String>,
    /// Filters in extraction order, keyed by lower-cased column name
    /// (`<col>_like` for pattern filters).
    pub filters: Vec<(String, FilterValue)>,
    /// ISO date bounds, explicit or auto-applied.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Verbatim `"<column> ASC|DESC"` ordering, if requested.
    pub order_by: Option<String>,
    /// Grouping columns, in caller order.
    pub group_by: Vec<String>,
}

impl FilterIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_filter(&self, key: &str) -> bool {
        self.filters.iter().any(|(k, _)| k == key)
    }

    pub fn push_filter(&mut self, key: impl Into<String>, value: FilterValue) {
        self.filters.push((key.into(), value));
    }

    /// True when both date bounds are set.
    pub fn has_date_range(&self) -> bool {
        self.start_date.is_some() && self.end_date.is_some()
    }
}
