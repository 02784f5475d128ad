//! Completed measurement records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form context attached to a span.
pub type Details = Map<String, Value>;

/// Details key whose numeric value is lifted into [`Metric::simulated_latency_ms`].
pub const SIMULATED_LATENCY_KEY: &str = "simulated_latency_ms";

/// What kind of work a span measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    Ui,
    Network,
    Computation,
    Render,
    UserInteraction,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 5] = [
        MetricCategory::Ui,
        MetricCategory::Network,
        MetricCategory::Computation,
        MetricCategory::Render,
        MetricCategory::UserInteraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCategory::Ui => "ui",
            MetricCategory::Network => "network",
            MetricCategory::Computation => "computation",
            MetricCategory::Render => "render",
            MetricCategory::UserInteraction => "user_interaction",
        }
    }
}

impl std::fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown metric category: {s}"))
    }
}

/// Heap usage reading at one instant. All zero when no probe is available.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub usage_percent: f64,
}

impl MemorySnapshot {
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let usage_percent = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 * 100.0 / total_bytes as f64
        };
        Self {
            used_bytes,
            total_bytes,
            usage_percent,
        }
    }

    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// One completed span plus the sampler readings current at its end.
///
/// Metrics are immutable once built; the aggregator only ever appends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Wall-clock completion time in epoch milliseconds.
    pub timestamp: i64,
    /// Never negative.
    pub duration_ms: f64,
    pub operation: String,
    pub category: MetricCategory,
    #[serde(default)]
    pub details: Details,
    pub memory: MemorySnapshot,
    pub cadence_fps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated_latency_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in MetricCategory::ALL {
            assert_eq!(category.as_str().parse::<MetricCategory>(), Ok(category));
        }
        assert!("disk".parse::<MetricCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_value(MetricCategory::UserInteraction).unwrap();
        assert_eq!(json, serde_json::json!("user_interaction"));
    }

    #[test]
    fn test_memory_snapshot_percentage() {
        let snapshot = MemorySnapshot::new(850, 1000);
        assert!((snapshot.usage_percent - 85.0).abs() < f64::EPSILON);
        assert_eq!(MemorySnapshot::new(10, 0).usage_percent, 0.0);
    }
}
