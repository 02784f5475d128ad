//! Append-only metrics log and windowed summaries.

use colloq_core::telemetry::{MemorySnapshot, Metric, MetricsSummary, SLOWEST_LIMIT};
use std::collections::BTreeMap;

/// Metrics in completion order.
///
/// Two overlapping spans are logged in the order they ended, not the order
/// they started.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    log: Vec<Metric>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, metric: Metric) {
        self.log.push(metric);
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    /// Statistics over metrics with `now_ms - timestamp <= window_ms`.
    pub fn summarize(
        &self,
        window_ms: u64,
        now_ms: i64,
        current_cadence_fps: f64,
        current_memory: MemorySnapshot,
    ) -> MetricsSummary {
        let window: Vec<&Metric> = self
            .log
            .iter()
            .filter(|m| now_ms.saturating_sub(m.timestamp) <= window_ms as i64)
            .collect();

        let total_count = window.len();
        let average_duration_ms = if total_count == 0 {
            0.0
        } else {
            window.iter().map(|m| m.duration_ms).sum::<f64>() / total_count as f64
        };

        let mut per_category = BTreeMap::new();
        for metric in &window {
            *per_category.entry(metric.category).or_insert(0) += 1;
        }

        let mut slowest: Vec<Metric> = window.into_iter().cloned().collect();
        slowest.sort_by(|a, b| b.duration_ms.total_cmp(&a.duration_ms));
        slowest.truncate(SLOWEST_LIMIT);

        MetricsSummary {
            window_ms,
            total_count,
            average_duration_ms,
            slowest,
            per_category,
            current_cadence_fps,
            current_memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloq_core::telemetry::{Details, MetricCategory};

    fn metric(operation: &str, category: MetricCategory, timestamp: i64, duration_ms: f64) -> Metric {
        Metric {
            timestamp,
            duration_ms,
            operation: operation.to_string(),
            category,
            details: Details::new(),
            memory: MemorySnapshot::zeroed(),
            cadence_fps: 0.0,
            simulated_latency_ms: None,
        }
    }

    fn sample_log() -> MetricsAggregator {
        let mut aggregator = MetricsAggregator::new();
        aggregator.append(metric("a", MetricCategory::Network, 1_000, 10.0));
        aggregator.append(metric("b", MetricCategory::Render, 5_000, 30.0));
        aggregator.append(metric("c", MetricCategory::Network, 9_000, 20.0));
        aggregator.append(metric("d", MetricCategory::Ui, 9_500, 40.0));
        aggregator
    }

    #[test]
    fn test_window_excludes_old_metrics() {
        let summary = sample_log().summarize(2_000, 10_000, 0.0, MemorySnapshot::zeroed());

        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.average_duration_ms, 30.0);
        assert_eq!(summary.per_category.get(&MetricCategory::Network), Some(&1));
        assert_eq!(summary.per_category.get(&MetricCategory::Ui), Some(&1));
        assert!(!summary.per_category.contains_key(&MetricCategory::Render));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let summary = sample_log().summarize(5_000, 10_000, 0.0, MemorySnapshot::zeroed());
        assert_eq!(summary.total_count, 3);
    }

    #[test]
    fn test_shrinking_window_never_increases_count() {
        let aggregator = sample_log();
        let mut previous = usize::MAX;
        for window in [100_000, 9_000, 5_000, 1_000, 500, 0] {
            let count = aggregator
                .summarize(window, 10_000, 0.0, MemorySnapshot::zeroed())
                .total_count;
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn test_slowest_is_sorted_and_capped() {
        let mut aggregator = MetricsAggregator::new();
        for i in 0..8 {
            aggregator.append(metric(&format!("op{i}"), MetricCategory::Computation, 0, i as f64));
        }

        let summary = aggregator.summarize(1_000, 0, 60.0, MemorySnapshot::zeroed());
        let durations: Vec<f64> = summary.slowest.iter().map(|m| m.duration_ms).collect();
        assert_eq!(durations, vec![7.0, 6.0, 5.0, 4.0, 3.0]);
        assert_eq!(summary.current_cadence_fps, 60.0);
    }

    #[test]
    fn test_empty_log_summary() {
        let summary = MetricsAggregator::new().summarize(1_000, 0, 0.0, MemorySnapshot::zeroed());
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.average_duration_ms, 0.0);
        assert!(summary.slowest.is_empty());
    }
}
