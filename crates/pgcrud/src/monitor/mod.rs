//! SQL logging for executed statements.
//!
//! The executor builds a [`QueryContext`] for every statement it runs and
//! hands it to the configured [`TracingSqlLogger`] (behind the `tracing`
//! feature).

mod types;

#[cfg(feature = "tracing")]
mod tracing_hook;

pub use types::{QueryContext, QueryType};

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingSqlLogger;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_type_detection() {
        assert_eq!(QueryType::from_sql("SELECT 1"), QueryType::Select);
        assert_eq!(QueryType::from_sql("  insert INTO t(a) VALUES($1)"), QueryType::Insert);
        assert_eq!(QueryType::from_sql("UPDATE t SET a=$1"), QueryType::Update);
        assert_eq!(QueryType::from_sql("DELETE FROM t"), QueryType::Delete);
        assert_eq!(QueryType::from_sql("(SELECT 1)"), QueryType::Other);
        assert_eq!(QueryType::from_sql("VACUUM"), QueryType::Other);
    }

    #[test]
    fn context_carries_tag() {
        let ctx = QueryContext::new("DELETE FROM t WHERE id=$1", 1).with_tag("t.delete");
        assert_eq!(ctx.query_type, QueryType::Delete);
        assert_eq!(ctx.tag.as_deref(), Some("t.delete"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT", 10), "SELECT");
        assert_eq!(truncate_sql_bytes("SELECT 'é'", 9), "SELECT '");
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn logger_truncates() {
        let logger = TracingSqlLogger::new().max_sql_length(6);
        assert_eq!(logger.truncate_sql("SELECT 1"), "SELECT...");
        assert_eq!(logger.clone().no_truncate().truncate_sql("SELECT 1"), "SELECT 1");
    }
}
