//! Heuristic row-count estimation for a synthesized query.
//!
//! Purely syntactic: operates on the WHERE predicate strings and the
//! table's total row count, never on value distributions. Good enough to
//! decide between running a query, sampling it, or rejecting it.

/// Selectivity divisor for an equality predicate.
const EQUALITY_DIVISOR: u64 = 10;
/// Selectivity divisor for a set-membership predicate.
const IN_DIVISOR: u64 = 5;
/// Selectivity divisor for a pattern predicate.
const LIKE_DIVISOR: u64 = 2;

/// Estimate how many rows a query with the given predicates would touch.
///
/// With no predicates the estimate is the full table. Otherwise each
/// predicate is classified by substring, checked in a fixed order
/// (equality, then IN, then LIKE), and the classification of the LAST
/// predicate determines the estimate. Estimates never drop below 1 on a
/// non-empty table.
pub fn estimate_rows(where_conditions: &[String], row_count: u64) -> u64 {
    let mut estimated = row_count;
    for condition in where_conditions {
        estimated = if condition.contains('=') {
            (row_count / EQUALITY_DIVISOR).max(1)
        } else if condition.contains("IN") {
            (row_count / IN_DIVISOR).max(1)
        } else if condition.contains("LIKE") {
            (row_count / LIKE_DIVISOR).max(1)
        } else {
            row_count
        };
    }
    estimated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_conditions_is_full_table() {
        assert_eq!(estimate_rows(&[], 1_000), 1_000);
        assert_eq!(estimate_rows(&[], 0), 0);
    }

    #[test]
    fn test_single_condition_classes() {
        let eq = vec!["status = :param1".to_string()];
        assert_eq!(estimate_rows(&eq, 1_000), 100);

        let set = vec!["status IN (:param1_0, :param1_1)".to_string()];
        assert_eq!(estimate_rows(&set, 1_000), 200);

        let like = vec!["name LIKE :param1".to_string()];
        assert_eq!(estimate_rows(&like, 1_000), 500);
    }

    #[test]
    fn test_between_counts_as_unclassified() {
        let between = vec!["created_at BETWEEN :start_date AND :end_date".to_string()];
        assert_eq!(estimate_rows(&between, 1_000), 1_000);
    }

    #[test]
    fn test_last_condition_wins() {
        // Classification is not cumulative; only the final predicate's
        // class matters.
        let conditions = vec![
            "status = :param1".to_string(),
            "name LIKE :param2".to_string(),
        ];
        assert_eq!(estimate_rows(&conditions, 1_000), 500);

        let reversed = vec![
            "name LIKE :param1".to_string(),
            "status = :param2".to_string(),
        ];
        assert_eq!(estimate_rows(&reversed, 1_000), 100);
    }

    #[test]
    fn test_floor_of_one_on_tiny_tables() {
        let eq = vec!["status = :param1".to_string()];
        assert_eq!(estimate_rows(&eq, 3), 1);
    }

    #[test]
    fn test_equality_check_shadows_in_placeholders() {
        // An IN predicate carrying an '=' anywhere would classify as
        // equality; the synthesizer's placeholder style avoids that.
        let set = vec!["region IN (:param1_0)".to_string()];
        assert_eq!(estimate_rows(&set, 500), 500 / IN_DIVISOR);
    }
}
