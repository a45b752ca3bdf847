//! Trait definitions for statement builders.

use crate::client::GenericClient;
use crate::error::OrmResult;
use crate::value::Value;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// The result of building a statement: SQL text plus its positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect()
    }

    /// Whether the statement produces rows (a SELECT or a `RETURNING` mutation).
    pub fn returns_rows(&self) -> bool {
        let sql = self.sql.trim();
        sql.get(..6).is_some_and(|head| head.eq_ignore_ascii_case("select"))
            || sql.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("with"))
            || sql.ends_with("RETURNING *")
    }
}

/// Base trait for all statement builders.
///
/// `build_query` returns `None` when there is nothing to execute (an insert
/// or update without assignable fields); the execution helpers then skip the
/// round trip.
pub trait SqlQb: Sync {
    /// Build the statement with a fresh parameter list.
    fn build_query(&self) -> Option<BuiltQuery>;

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> Option<String> {
        self.build_query().map(|q| q.sql)
    }

    /// Execute and return all rows.
    fn fetch_all(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send {
        async move {
            match self.build_query() {
                Some(q) => conn.query(&q.sql, &q.params_ref()).await,
                None => Ok(Vec::new()),
            }
        }
    }

    /// Execute and return the first row, if any.
    fn fetch_opt(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<Option<Row>>> + Send {
        async move {
            match self.build_query() {
                Some(q) => conn.query_opt(&q.sql, &q.params_ref()).await,
                None => Ok(None),
            }
        }
    }

    /// Execute and return the affected row count.
    fn execute(
        &self,
        conn: &impl GenericClient,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        async move {
            match self.build_query() {
                Some(q) => conn.execute(&q.sql, &q.params_ref()).await,
                None => Ok(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_returning_statements() {
        assert!(BuiltQuery::new("SELECT 1", vec![]).returns_rows());
        assert!(BuiltQuery::new("INSERT INTO t(a) VALUES($1) RETURNING *", vec![]).returns_rows());
        assert!(!BuiltQuery::new("DELETE FROM t WHERE id=$1", vec![]).returns_rows());
    }

    #[test]
    fn params_ref_matches_params() {
        let q = BuiltQuery::new("SELECT $1, $2", vec![Value::Int(1), Value::from("a")]);
        assert_eq!(q.params_ref().len(), 2);
    }
}
