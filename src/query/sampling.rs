//! Sampling rewrite: degrade an over-budget query into a random subset.

/// Rewrite `sql` to touch roughly `rate` of its rows.
///
/// Injects a `(ABS(RANDOM()) % 100) < n` predicate, where `n` is the rate
/// as a whole percentage. The predicate lands before any existing clause
/// that must follow it: an existing WHERE gets it prepended with AND,
/// otherwise it slots in ahead of ORDER BY or LIMIT, otherwise it is
/// appended. Only the first occurrence of each keyword is considered, so
/// the synthesizer's single-clause output is rewritten exactly once.
pub fn apply_sampling(sql: &str, rate: f64) -> String {
    let percent = (rate * 100.0) as i64;
    let predicate = format!("(ABS(RANDOM()) % 100) < {}", percent);

    if sql.contains("WHERE") {
        sql.replacen("WHERE", &format!("WHERE {} AND", predicate), 1)
    } else if sql.contains("ORDER BY") {
        sql.replacen("ORDER BY", &format!("WHERE {} ORDER BY", predicate), 1)
    } else if sql.contains("LIMIT") {
        sql.replacen("LIMIT", &format!("WHERE {} LIMIT", predicate), 1)
    } else {
        format!("{} WHERE {}", sql, predicate)
    }
}
