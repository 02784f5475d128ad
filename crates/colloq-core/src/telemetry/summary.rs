//! Aggregated views over the metrics log.

use super::metric::{MemorySnapshot, Metric, MetricCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of entries reported in [`MetricsSummary::slowest`].
pub const SLOWEST_LIMIT: usize = 5;

/// Statistics over the metrics that completed within a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub window_ms: u64,
    pub total_count: usize,
    pub average_duration_ms: f64,
    /// Up to [`SLOWEST_LIMIT`] metrics, slowest first.
    pub slowest: Vec<Metric>,
    pub per_category: BTreeMap<MetricCategory, usize>,
    pub current_cadence_fps: f64,
    pub current_memory: MemorySnapshot,
}

/// Operator-facing dump of the whole log. No compatibility contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
    pub metrics: Vec<Metric>,
    pub summary: MetricsSummary,
    /// RFC 3339
    pub exported_at: String,
}
