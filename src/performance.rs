//! Operation timing and batching
//!
//! [`PerformanceMonitor`] keeps a bounded, sampled history of store
//! operations. Callers wrap an operation with [`PerformanceMonitor::track`]
//! to record its duration and outcome.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineFailure, LedgerError, LedgerResult};
use crate::storage::TableName;

/// Kind of operation being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Write,
    Query,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Query => "query",
        };
        write!(f, "{}", name)
    }
}

/// What a query asked for, for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDetails {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

impl QueryDetails {
    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }

    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// One recorded operation
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetric {
    pub operation_type: OperationType,
    pub table_name: TableName,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error: Option<String>,
    pub query_details: Option<QueryDetails>,
}

impl PerformanceMetric {
    /// Grouping key used in [`MetricsStats`]
    pub fn key(&self) -> String {
        format!("{}_{}", self.operation_type, self.table_name)
    }
}

/// Monitoring preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Fraction of operations recorded, 0.0 to 1.0
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,

    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,

    /// Oldest metrics are dropped past this count
    #[serde(default = "default_max_metrics")]
    pub max_metrics: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_sample_rate() -> f64 {
    0.1
}

fn default_slow_query_threshold_ms() -> u64 {
    100
}

fn default_max_metrics() -> usize {
    1000
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sample_rate: default_sample_rate(),
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
            max_metrics: default_max_metrics(),
        }
    }
}

impl MonitoringConfig {
    pub fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_threshold_ms)
    }
}

/// Partial update for [`MonitoringConfig`]
#[derive(Debug, Clone, Default)]
pub struct MonitoringConfigUpdate {
    pub enabled: Option<bool>,
    pub sample_rate: Option<f64>,
    pub slow_query_threshold_ms: Option<u64>,
    pub max_metrics: Option<usize>,
}

/// Aggregates over the recorded history
#[derive(Debug, Clone, Default)]
pub struct MetricsStats {
    /// Mean duration per `{operation}_{table}`
    pub avg_duration: HashMap<String, Duration>,
    /// Share of failed operations per `{operation}_{table}`
    pub error_rate: HashMap<String, f64>,
    pub slow_queries: Vec<PerformanceMetric>,
}

/// How often recording prunes the history
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Age past which metrics are pruned
pub const METRICS_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Sampled, bounded operation history
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: Mutex<Vec<PerformanceMetric>>,
    config: RwLock<MonitoringConfig>,
    last_pruned: Mutex<Option<Instant>>,
}

impl PerformanceMonitor {
    pub fn new(config: MonitoringConfig) -> Self {
        Self {
            metrics: Mutex::new(Vec::new()),
            config: RwLock::new(config),
            last_pruned: Mutex::new(None),
        }
    }

    fn lock_metrics(&self) -> LedgerResult<MutexGuard<'_, Vec<PerformanceMetric>>> {
        self.metrics.lock().map_err(|e| {
            LedgerError::from(EngineFailure::InvalidState(format!(
                "metrics lock poisoned: {}",
                e
            )))
        })
    }

    /// Current configuration
    pub fn config(&self) -> LedgerResult<MonitoringConfig> {
        let config = self.config.read().map_err(|e| {
            LedgerError::from(EngineFailure::InvalidState(format!(
                "monitor config lock poisoned: {}",
                e
            )))
        })?;
        Ok(config.clone())
    }

    pub fn update_config(&self, update: MonitoringConfigUpdate) -> LedgerResult<()> {
        let mut config = self.config.write().map_err(|e| {
            LedgerError::from(EngineFailure::InvalidState(format!(
                "monitor config lock poisoned: {}",
                e
            )))
        })?;
        if let Some(enabled) = update.enabled {
            config.enabled = enabled;
        }
        if let Some(rate) = update.sample_rate {
            config.sample_rate = rate.clamp(0.0, 1.0);
        }
        if let Some(threshold) = update.slow_query_threshold_ms {
            config.slow_query_threshold_ms = threshold;
        }
        if let Some(max) = update.max_metrics {
            config.max_metrics = max;
        }
        Ok(())
    }

    /// Record a metric, subject to sampling
    pub fn record(&self, metric: PerformanceMetric) -> LedgerResult<()> {
        let config = self.config()?;
        if !config.enabled || rand::random::<f64>() >= config.sample_rate {
            return Ok(());
        }

        if metric.duration > config.slow_query_threshold() {
            warn!(
                operation = %metric.operation_type,
                table = %metric.table_name,
                duration_ms = metric.duration.as_millis() as u64,
                threshold_ms = config.slow_query_threshold_ms,
                "Slow query detected"
            );
        }

        {
            let mut metrics = self.lock_metrics()?;
            metrics.push(metric);
            if metrics.len() > config.max_metrics {
                let excess = metrics.len() - config.max_metrics;
                metrics.drain(..excess);
            }
        }
        self.prune_if_due(PRUNE_INTERVAL)?;
        Ok(())
    }

    /// Drop metrics older than [`METRICS_MAX_AGE`] once `interval` has
    /// passed since the last prune. The first call only starts the clock.
    fn prune_if_due(&self, interval: Duration) -> LedgerResult<()> {
        let mut last_pruned = self.last_pruned.lock().map_err(|e| {
            LedgerError::from(EngineFailure::InvalidState(format!(
                "prune clock lock poisoned: {}",
                e
            )))
        })?;
        let now = Instant::now();
        match *last_pruned {
            Some(at) if now.duration_since(at) < interval => {}
            Some(_) => {
                *last_pruned = Some(now);
                drop(last_pruned);
                let removed = self.clear_older_than(METRICS_MAX_AGE)?;
                if removed > 0 {
                    debug!(removed, "Pruned old performance metrics");
                }
            }
            None => *last_pruned = Some(now),
        }
        Ok(())
    }

    /// Copy of the recorded history, oldest first
    pub fn metrics(&self) -> LedgerResult<Vec<PerformanceMetric>> {
        Ok(self.lock_metrics()?.clone())
    }

    pub fn stats(&self) -> LedgerResult<MetricsStats> {
        let threshold = self.config()?.slow_query_threshold();
        let metrics = self.lock_metrics()?;

        let mut groups: HashMap<String, Vec<&PerformanceMetric>> = HashMap::new();
        for metric in metrics.iter() {
            groups.entry(metric.key()).or_default().push(metric);
        }

        let mut stats = MetricsStats::default();
        for (key, group) in groups {
            let count = group.len() as u32;
            let total: Duration = group.iter().map(|m| m.duration).sum();
            let failures = group.iter().filter(|m| !m.success).count();

            stats.avg_duration.insert(key.clone(), total / count);
            stats
                .error_rate
                .insert(key, failures as f64 / group.len() as f64);
        }

        stats.slow_queries = metrics
            .iter()
            .filter(|m| m.duration > threshold)
            .cloned()
            .collect();

        Ok(stats)
    }

    /// Drop metrics older than `max_age`
    pub fn clear_older_than(&self, max_age: Duration) -> LedgerResult<usize> {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::weeks(52 * 1000));
        let now = Utc::now();
        let mut metrics = self.lock_metrics()?;
        let before = metrics.len();
        metrics.retain(|m| now.signed_duration_since(m.timestamp) < max_age);
        Ok(before - metrics.len())
    }

    /// Time `operation` and record the outcome.
    ///
    /// The operation's result is returned untouched; a failure to record
    /// never masks it.
    pub fn track<R, F>(
        &self,
        operation_type: OperationType,
        table_name: TableName,
        query_details: Option<QueryDetails>,
        operation: F,
    ) -> LedgerResult<R>
    where
        F: FnOnce() -> LedgerResult<R>,
    {
        let started = Instant::now();
        let result = operation();
        let metric = PerformanceMetric {
            operation_type,
            table_name,
            duration: started.elapsed(),
            timestamp: Utc::now(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            query_details,
        };
        if let Err(e) = self.record(metric) {
            warn!(error = %e, "Failed to record performance metric");
        }
        result
    }
}

/// Track `operation` when a monitor is present, otherwise just run it
pub fn tracked<R, F>(
    monitor: Option<&PerformanceMonitor>,
    operation_type: OperationType,
    table_name: TableName,
    query_details: Option<QueryDetails>,
    operation: F,
) -> LedgerResult<R>
where
    F: FnOnce() -> LedgerResult<R>,
{
    match monitor {
        Some(monitor) => monitor.track(operation_type, table_name, query_details, operation),
        None => operation(),
    }
}

/// Run `operation` over consecutive chunks of at most `batch_size` items,
/// concatenating the results in order. Stops at the first failing chunk.
pub fn batch_operation<T, R, F>(items: &[T], batch_size: usize, mut operation: F) -> LedgerResult<Vec<R>>
where
    F: FnMut(&[T]) -> LedgerResult<Vec<R>>,
{
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(batch_size.max(1)) {
        results.extend(operation(chunk)?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_sample() -> MonitoringConfig {
        MonitoringConfig {
            sample_rate: 1.0,
            ..MonitoringConfig::default()
        }
    }

    fn metric(op: OperationType, duration_ms: u64, success: bool) -> PerformanceMetric {
        PerformanceMetric {
            operation_type: op,
            table_name: TableName::Accounts,
            duration: Duration::from_millis(duration_ms),
            timestamp: Utc::now(),
            success,
            error: (!success).then(|| "boom".to_string()),
            query_details: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = MonitoringConfig::default();
        assert!(config.enabled);
        assert_eq!(config.slow_query_threshold_ms, 100);
        assert_eq!(config.max_metrics, 1000);
    }

    #[test]
    fn test_stats_group_by_operation_and_table() {
        let monitor = PerformanceMonitor::new(always_sample());
        monitor.record(metric(OperationType::Read, 10, true)).unwrap();
        monitor.record(metric(OperationType::Read, 30, false)).unwrap();
        monitor.record(metric(OperationType::Write, 150, true)).unwrap();

        let stats = monitor.stats().unwrap();
        assert_eq!(stats.avg_duration["read_accounts"], Duration::from_millis(20));
        assert!((stats.error_rate["read_accounts"] - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.error_rate["write_accounts"], 0.0);
        assert_eq!(stats.slow_queries.len(), 1);
        assert_eq!(stats.slow_queries[0].operation_type, OperationType::Write);
    }

    #[test]
    fn test_history_is_bounded() {
        let monitor = PerformanceMonitor::new(MonitoringConfig {
            max_metrics: 2,
            ..always_sample()
        });
        for ms in [1, 2, 3] {
            monitor.record(metric(OperationType::Read, ms, true)).unwrap();
        }
        let metrics = monitor.metrics().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].duration, Duration::from_millis(2));
    }

    #[test]
    fn test_disabled_or_unsampled_records_nothing() {
        let monitor = PerformanceMonitor::new(MonitoringConfig {
            sample_rate: 0.0,
            ..MonitoringConfig::default()
        });
        monitor.record(metric(OperationType::Read, 1, true)).unwrap();
        assert!(monitor.metrics().unwrap().is_empty());

        monitor
            .update_config(MonitoringConfigUpdate {
                enabled: Some(false),
                sample_rate: Some(1.0),
                ..Default::default()
            })
            .unwrap();
        monitor.record(metric(OperationType::Read, 1, true)).unwrap();
        assert!(monitor.metrics().unwrap().is_empty());
        assert!(!monitor.config().unwrap().enabled);
    }

    #[test]
    fn test_recording_prunes_stale_metrics_when_due() {
        let monitor = PerformanceMonitor::new(always_sample());
        let mut stale = metric(OperationType::Read, 1, true);
        stale.timestamp = Utc::now() - chrono::Duration::hours(25);
        monitor.record(stale).unwrap();
        monitor.record(metric(OperationType::Read, 2, true)).unwrap();
        // Interval not yet elapsed
        assert_eq!(monitor.metrics().unwrap().len(), 2);

        monitor.prune_if_due(Duration::ZERO).unwrap();
        let metrics = monitor.metrics().unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].duration, Duration::from_millis(2));
    }

    #[test]
    fn test_clear_older_than() {
        let monitor = PerformanceMonitor::new(always_sample());
        let mut old = metric(OperationType::Query, 1, true);
        old.timestamp = Utc::now() - chrono::Duration::hours(48);
        monitor.record(old).unwrap();
        monitor.record(metric(OperationType::Query, 1, true)).unwrap();

        let removed = monitor
            .clear_older_than(Duration::from_secs(24 * 60 * 60))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(monitor.metrics().unwrap().len(), 1);
    }

    #[test]
    fn test_track_records_failure_and_returns_error() {
        let monitor = PerformanceMonitor::new(always_sample());
        let result: LedgerResult<()> = monitor.track(
            OperationType::Write,
            TableName::Budgets,
            Some(QueryDetails::limit(3)),
            || Err(LedgerError::Database("down".into())),
        );
        assert!(result.is_err());

        let metrics = monitor.metrics().unwrap();
        assert_eq!(metrics.len(), 1);
        assert!(!metrics[0].success);
        assert_eq!(metrics[0].key(), "write_budgets");
        assert_eq!(metrics[0].query_details, Some(QueryDetails::limit(3)));
    }

    #[test]
    fn test_batch_operation_chunks_in_order() {
        let items: Vec<u32> = (1..=250).collect();
        let mut sizes = Vec::new();
        let doubled = batch_operation(&items, 100, |chunk| {
            sizes.push(chunk.len());
            Ok(chunk.iter().map(|n| n * 2).collect())
        })
        .unwrap();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(doubled.len(), 250);
        assert_eq!(doubled[249], 500);
    }

    #[test]
    fn test_batch_operation_stops_on_error() {
        let items = [1, 2, 3, 4];
        let mut calls = 0;
        let result: LedgerResult<Vec<i32>> = batch_operation(&items, 2, |_| {
            calls += 1;
            Err(LedgerError::Transaction("aborted".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
