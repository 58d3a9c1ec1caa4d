//! SQL tracing for any [`GenericClient`].
//!
//! [`TracingClient`] emits a `tracing` event on target `jobly.sql` before each
//! statement and another with the elapsed time once it completes. Failures are
//! reported at `WARN`.
//!
//! ```ignore
//! let client = TracingClient::new(pool.get().await?);
//! let jobs = Job::find_all(&client, &criteria).await?;
//! ```

use crate::client::GenericClient;
use crate::error::JoblyResult;
use std::time::{Duration, Instant};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::Level;

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

/// Truncate a string to at most `max` bytes on a char boundary.
fn truncate_sql_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Wraps a client and logs every statement it runs.
#[derive(Debug, Clone)]
pub struct TracingClient<C> {
    inner: C,
    level: Level,
    max_sql_length: Option<usize>,
    slow_threshold: Option<Duration>,
}

impl<C: GenericClient> TracingClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: None,
        }
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

    /// Statements slower than `threshold` are reported at `WARN`.
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn before(&self, tag: &str, sql: &str, param_count: usize) {
        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "jobly.sql",
            tag,
            param_count,
            sql = %sql,
            "executing"
        );
    }

    fn after<T>(&self, tag: &str, started: Instant, result: &JoblyResult<T>, rows: Option<usize>) {
        let elapsed = started.elapsed();
        match result {
            Ok(_) => {
                if self.slow_threshold.is_some_and(|t| elapsed > t) {
                    tracing::warn!(target: "jobly.sql", tag, ?elapsed, rows, "slow query");
                } else {
                    emit_at_level!(self.level, target: "jobly.sql", tag, ?elapsed, rows, "done");
                }
            }
            Err(e) => tracing::warn!(target: "jobly.sql", tag, ?elapsed, error = %e, "failed"),
        }
    }
}

impl<C: GenericClient> GenericClient for TracingClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> JoblyResult<Vec<Row>> {
        self.query_tagged("-", sql, params).await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> JoblyResult<Vec<Row>> {
        self.before(tag, sql, params.len());
        let started = Instant::now();
        let result = self.inner.query(sql, params).await;
        let rows = result.as_ref().ok().map(Vec::len);
        self.after(tag, started, &result, rows);
        result
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> JoblyResult<u64> {
        self.execute_tagged("-", sql, params).await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> JoblyResult<u64> {
        self.before(tag, sql, params.len());
        let started = Instant::now();
        let result = self.inner.execute(sql, params).await;
        let rows = result.as_ref().ok().map(|n| *n as usize);
        self.after(tag, started, &result, rows);
        result
    }
}
