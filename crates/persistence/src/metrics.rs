//! Database and reference cache metrics.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Records how long a named query took.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Publishes connection pool occupancy.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Counts a reference cache lookup.
pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    if hit {
        counter!("reference_cache_hits_total", "cache" => cache).increment(1);
    } else {
        counter!("reference_cache_misses_total", "cache" => cache).increment(1);
    }
}

/// Times a query and records it under its name.
///
/// ```ignore
/// let timer = QueryTimer::new("find_dereg_details");
/// let result = sqlx::query_as::<_, DeRegDetailsEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_keeps_name() {
        let timer = QueryTimer::new("replace_dereg_devices");
        assert_eq!(timer.query_name, "replace_dereg_devices");
        timer.record();
    }

    #[test]
    fn test_cache_lookup_without_recorder() {
        record_cache_lookup("status", true);
        record_cache_lookup("status", false);
    }
}
