//! Query latency and connection pool gauges.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Point-in-time view of the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub size: u32,
    pub idle: usize,
}

impl PoolSnapshot {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle(),
        }
    }

    /// Connections checked out right now.
    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }

    /// Sets the `database_connections` gauges.
    pub fn publish(&self) {
        gauge!("database_connections", "state" => "in_use").set(self.in_use() as f64);
        gauge!("database_connections", "state" => "idle").set(self.idle as f64);
        gauge!("database_connections_total").set(self.size as f64);
    }
}

/// Times one repository query and labels it with its outcome.
///
/// ```ignore
/// let timer = QueryTimer::start("find_alert_by_id");
/// let entity = sqlx::query_as::<_, AlertEntity>(...).fetch_optional(&pool).await;
/// timer.finish(&entity);
/// ```
pub struct QueryTimer {
    query: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn start(query: &'static str) -> Self {
        Self {
            query,
            started: Instant::now(),
        }
    }

    pub fn finish<T, E>(self, result: &Result<T, E>) {
        let outcome = outcome_label(result);
        histogram!(
            "database_query_duration_seconds",
            "query" => self.query,
            "outcome" => outcome
        )
        .record(self.started.elapsed().as_secs_f64());

        if result.is_err() {
            counter!("database_query_errors_total", "query" => self.query).increment(1);
        }
    }
}

fn outcome_label<T, E>(result: &Result<T, E>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(_) => "error",
    }
}
