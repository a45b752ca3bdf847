//! Execution boundary: runs built statements and classifies the outcome.
//!
//! The builders never touch a connection. Everything that talks to the
//! database goes through [`execute`] (or [`ExecutorContext`], which owns the
//! pool), and comes back as a [`QueryOutcome`].

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::monitor::QueryContext;
use crate::qb::{BuiltQuery, SqlQb};
use std::time::Instant;
use tokio_postgres::Row;

#[cfg(feature = "pool")]
use crate::config::ExecutorConfig;
#[cfg(feature = "pool")]
use crate::crud::Crud;
#[cfg(feature = "pool")]
use crate::entity::TableRef;
#[cfg(feature = "tracing")]
use crate::monitor::TracingSqlLogger;

/// Default byte length at which logged SQL is cut.
pub(crate) const DEFAULT_LOG_SQL_MAX_LENGTH: usize = 200;

/// Classified result of running one statement.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The statement returned at least one row.
    Rows(Vec<Row>),
    /// A statement without result rows touched this many rows (never 0).
    Affected(u64),
    /// No rows returned and none affected.
    Empty,
    /// A unique constraint rejected the write.
    UniqueViolation(String),
    /// Any other failure.
    Other(OrmError),
}

impl QueryOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::Empty)
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, QueryOutcome::UniqueViolation(_))
    }

    /// Rows returned or touched.
    pub fn affected(&self) -> u64 {
        match self {
            QueryOutcome::Rows(rows) => rows.len() as u64,
            QueryOutcome::Affected(n) => *n,
            _ => 0,
        }
    }

    /// Returned rows; failures become errors.
    pub fn into_rows(self) -> OrmResult<Vec<Row>> {
        match self {
            QueryOutcome::Rows(rows) => Ok(rows),
            QueryOutcome::Affected(_) | QueryOutcome::Empty => Ok(Vec::new()),
            QueryOutcome::UniqueViolation(message) => Err(OrmError::UniqueViolation(message)),
            QueryOutcome::Other(err) => Err(err),
        }
    }

    /// First returned row, if any; failures become errors.
    pub fn into_first(self) -> OrmResult<Option<Row>> {
        Ok(self.into_rows()?.into_iter().next())
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Rows(_) => "rows",
            QueryOutcome::Affected(_) => "affected",
            QueryOutcome::Empty => "empty",
            QueryOutcome::UniqueViolation(_) => "unique_violation",
            QueryOutcome::Other(_) => "error",
        }
    }

    fn classify(result: OrmResult<QueryOutcome>) -> Self {
        match result {
            Ok(QueryOutcome::Rows(rows)) if rows.is_empty() => QueryOutcome::Empty,
            Ok(QueryOutcome::Affected(0)) => QueryOutcome::Empty,
            Ok(outcome) => outcome,
            Err(OrmError::UniqueViolation(message)) => QueryOutcome::UniqueViolation(message),
            Err(err) => QueryOutcome::Other(err),
        }
    }
}

/// Run `query` on `conn`.
///
/// Statements that produce rows (SELECT, `RETURNING *`) are run with
/// `query`, everything else with `execute`.
pub async fn execute(conn: &impl GenericClient, query: &BuiltQuery) -> QueryOutcome {
    execute_tagged(conn, query, None, DEFAULT_LOG_SQL_MAX_LENGTH).await
}

pub(crate) async fn execute_tagged(
    conn: &impl GenericClient,
    query: &BuiltQuery,
    tag: Option<&str>,
    log_sql_max_length: usize,
) -> QueryOutcome {
    let mut ctx = QueryContext::new(query.sql.as_str(), query.params.len());
    if let Some(tag) = tag {
        ctx = ctx.with_tag(tag);
    }
    let started = Instant::now();

    let params = query.params_ref();
    let result = if query.returns_rows() {
        conn.query(&query.sql, &params).await.map(QueryOutcome::Rows)
    } else {
        conn.execute(&query.sql, &params).await.map(QueryOutcome::Affected)
    };
    let outcome = QueryOutcome::classify(result);

    #[cfg(feature = "tracing")]
    {
        let logger = TracingSqlLogger::new().max_sql_length(log_sql_max_length);
        match &outcome {
            QueryOutcome::Other(err) => logger.failed(&ctx, err),
            other => logger.completed(&ctx, started.elapsed(), other.label()),
        }
    }
    #[cfg(not(feature = "tracing"))]
    let _ = (ctx, started, log_sql_max_length);

    outcome
}

/// Run a SELECT builder and return its rows.
pub async fn select(conn: &impl GenericClient, qb: &impl SqlQb) -> OrmResult<Vec<Row>> {
    match qb.build_query() {
        Some(query) => execute(conn, &query).await.into_rows(),
        None => Ok(Vec::new()),
    }
}

/// Run a SELECT builder and return its first row.
pub async fn select_one(conn: &impl GenericClient, qb: &impl SqlQb) -> OrmResult<Option<Row>> {
    match qb.build_query() {
        Some(query) => execute(conn, &query).await.into_first(),
        None => Ok(None),
    }
}

/// Explicitly constructed owner of the connection pool.
///
/// ```ignore
/// let ctx = ExecutorContext::init(ExecutorConfig::from_env()?)?;
/// let client = ctx.client().await?;
/// let rows = ctx.run(&client, &qb::select(&users, "u").build()).await.into_rows()?;
/// ctx.shutdown();
/// ```
#[cfg(feature = "pool")]
#[derive(Clone)]
pub struct ExecutorContext {
    pool: deadpool_postgres::Pool,
    config: ExecutorConfig,
}

#[cfg(feature = "pool")]
impl ExecutorContext {
    /// Build the pool. Connections are opened lazily.
    pub fn init(config: ExecutorConfig) -> OrmResult<Self> {
        let pool = crate::pool::create_pool(&config)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "pgcrud.sql",
            max_pool_size = config.max_pool_size,
            "executor initialized"
        );
        Ok(Self { pool, config })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: deadpool_postgres::Pool, config: ExecutorConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn pool(&self) -> &deadpool_postgres::Pool {
        &self.pool
    }

    /// Check out a pooled client.
    pub async fn client(&self) -> OrmResult<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    /// Run `query` on `conn`, logging with this context's settings.
    pub async fn run(&self, conn: &impl GenericClient, query: &BuiltQuery) -> QueryOutcome {
        execute_tagged(conn, query, None, self.config.log_sql_max_length).await
    }

    /// Check out a client and run `query` on it.
    pub async fn run_pooled(&self, query: &BuiltQuery) -> QueryOutcome {
        match self.client().await {
            Ok(client) => self.run(&client, query).await,
            Err(err) => QueryOutcome::Other(err),
        }
    }

    /// CRUD façade over `table` using this context's logging settings.
    pub fn crud(&self, table: &TableRef) -> Crud {
        Crud::new(table).log_sql_max_length(self.config.log_sql_max_length)
    }

    /// Close the pool. Checked-out clients are dropped when returned.
    pub fn shutdown(&self) {
        self.pool.close();
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "pgcrud.sql", "executor shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
