//! Row-limit enforcement on the root query.

use crate::tree::{ExpressionTree, Limit};

/// Clamp or inject the root LIMIT. Returns the effective limit.
///
/// A missing LIMIT becomes `default_limit`; a requested one becomes
/// `min(requested, max_limit)`. The default is itself capped by the maximum.
pub fn enforce_limit(tree: &mut ExpressionTree, default_limit: u64, max_limit: u64) -> u64 {
    let fallback = default_limit.min(max_limit);
    let limit = tree.query.limit.get_or_insert(Limit {
        count: None,
        offset: None,
    });
    let effective = match limit.count {
        Some(requested) => requested.min(max_limit),
        None => fallback,
    };
    limit.count = Some(effective);
    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;

    fn enforce(sql: &str) -> u64 {
        let mut tree = SqlParser::new().parse(sql).unwrap();
        let effective = enforce_limit(&mut tree, 100, 200);
        assert_eq!(
            tree.query.limit.as_ref().and_then(|l| l.count),
            Some(effective)
        );
        effective
    }

    #[test]
    fn test_injects_default() {
        assert_eq!(enforce("SELECT name FROM files"), 100);
    }

    #[test]
    fn test_keeps_smaller_request() {
        assert_eq!(enforce("SELECT name FROM files LIMIT 50"), 50);
        assert_eq!(enforce("SELECT name FROM files LIMIT 0"), 0);
        assert_eq!(enforce("SELECT name FROM files LIMIT 150"), 150);
    }

    #[test]
    fn test_clamps_to_max() {
        assert_eq!(enforce("SELECT name FROM files LIMIT 5000"), 200);
    }

    #[test]
    fn test_default_never_exceeds_max() {
        let mut tree = SqlParser::new().parse("SELECT name FROM files").unwrap();
        assert_eq!(enforce_limit(&mut tree, 500, 20), 20);
    }

    #[test]
    fn test_offset_is_kept() {
        let mut tree = SqlParser::new()
            .parse("SELECT name FROM files LIMIT 10 OFFSET 5")
            .unwrap();
        enforce_limit(&mut tree, 100, 200);
        let limit = tree.query.limit.unwrap();
        assert_eq!(limit.count, Some(10));
        assert!(limit.offset.is_some());
    }
}
