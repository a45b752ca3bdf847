use super::truncate_sql_bytes;
use super::types::QueryContext;
use std::time::Duration;
use tracing::Level;

/// A `tracing`-based logger for the SQL the executor runs.
///
/// Statements are logged at `level` after they complete; failures are always
/// logged at `ERROR`. All events use the `pgcrud.sql` target.
///
/// Enable via the crate feature: `pgcrud = { features = ["tracing"] }`.
#[derive(Debug, Clone)]
pub struct TracingSqlLogger {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingSqlLogger {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingSqlLogger {
    /// Create a new logger with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Log a finished statement.
    pub fn completed(&self, ctx: &QueryContext, elapsed: Duration, outcome: &str) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let tag = ctx.tag.as_deref().unwrap_or("-");
        let sql = self.truncate_sql(&ctx.sql);
        emit_at_level!(
            self.level,
            target: "pgcrud.sql",
            query_type = %ctx.query_type,
            tag,
            param_count = ctx.param_count,
            elapsed_us = elapsed.as_micros() as u64,
            outcome,
            sql = %sql,
        );
    }

    /// Log a failed statement.
    pub fn failed(&self, ctx: &QueryContext, error: &dyn std::error::Error) {
        let tag = ctx.tag.as_deref().unwrap_or("-");
        let sql = self.truncate_sql(&ctx.sql);
        tracing::error!(
            target: "pgcrud.sql",
            query_type = %ctx.query_type,
            tag,
            param_count = ctx.param_count,
            error = %error,
            sql = %sql,
            "query failed"
        );
    }
}
