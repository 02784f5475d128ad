//! Registry of open timing spans.
//!
//! Spans are keyed by a generated id rather than by operation name, so any
//! number of spans for the same operation can be open at once.

use colloq_core::telemetry::{Details, MetricCategory};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of one open span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(String);

impl TimerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TimerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A span that has been started but not ended.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTimer {
    pub id: TimerId,
    pub operation: String,
    pub category: MetricCategory,
    /// Monotonic clock reading at start, in milliseconds.
    pub started_at_ms: f64,
    pub details: Details,
}

/// Flat map of open spans.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    open: HashMap<TimerId, OpenTimer>,
    max_age_ms: Option<u64>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that drops spans left open longer than `max_age_ms`.
    pub fn with_max_age(max_age_ms: Option<u64>) -> Self {
        Self {
            open: HashMap::new(),
            max_age_ms,
        }
    }

    /// Opens a span and returns its id.
    ///
    /// The id combines the operation name, the monotonic reading and a random
    /// suffix; a collision with a still-open id is retried.
    pub fn start(
        &mut self,
        operation: impl Into<String>,
        category: MetricCategory,
        details: Details,
        now_ms: f64,
    ) -> TimerId {
        self.prune_stale(now_ms);

        let operation = operation.into();
        let mut rng = rand::thread_rng();
        let id = loop {
            let candidate = TimerId(format!(
                "{}-{:.3}-{:08x}",
                operation,
                now_ms,
                rng.r#gen::<u32>()
            ));
            if !self.open.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::trace!("[TimerRegistry] start: id={}", id);
        self.open.insert(
            id.clone(),
            OpenTimer {
                id: id.clone(),
                operation,
                category,
                started_at_ms: now_ms,
                details,
            },
        );
        id
    }

    /// Removes and returns the span, or `None` if it is unknown or already ended.
    pub fn finish(&mut self, id: &TimerId) -> Option<OpenTimer> {
        let timer = self.open.remove(id);
        if timer.is_none() {
            tracing::warn!(
                "[TimerRegistry] end called for unknown or already-ended timer: {}",
                id
            );
        }
        timer
    }

    /// Drops spans older than the configured maximum age. Returns how many were dropped.
    pub fn prune_stale(&mut self, now_ms: f64) -> usize {
        let Some(max_age_ms) = self.max_age_ms else {
            return 0;
        };

        let before = self.open.len();
        self.open.retain(|id, timer| {
            let keep = now_ms - timer.started_at_ms <= max_age_ms as f64;
            if !keep {
                tracing::warn!(
                    "[TimerRegistry] dropping timer {} ({}) open longer than {}ms",
                    id,
                    timer.operation,
                    max_age_ms
                );
            }
            keep
        });
        before - self.open.len()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn is_open(&self, id: &TimerId) -> bool {
        self.open.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_operation_gets_distinct_ids() {
        let mut registry = TimerRegistry::new();
        let a = registry.start("fetch", MetricCategory::Network, Details::new(), 10.0);
        let b = registry.start("fetch", MetricCategory::Network, Details::new(), 10.0);

        assert_ne!(a, b);
        assert!(a.as_str().starts_with("fetch-10.000-"));
        assert_eq!(registry.open_count(), 2);
    }

    #[test]
    fn test_finish_is_at_most_once() {
        let mut registry = TimerRegistry::new();
        let id = registry.start("render", MetricCategory::Render, Details::new(), 0.0);

        let timer = registry.finish(&id).unwrap();
        assert_eq!(timer.operation, "render");
        assert!(registry.finish(&id).is_none());
        assert!(registry.finish(&TimerId::from("never-started")).is_none());
    }

    #[test]
    fn test_unbounded_registry_keeps_old_timers() {
        let mut registry = TimerRegistry::new();
        registry.start("leak", MetricCategory::Ui, Details::new(), 0.0);
        registry.start("other", MetricCategory::Ui, Details::new(), 1_000_000.0);
        assert_eq!(registry.open_count(), 2);
    }

    #[test]
    fn test_bounded_registry_prunes_on_start() {
        let mut registry = TimerRegistry::with_max_age(Some(1_000));
        let stale = registry.start("stale", MetricCategory::Ui, Details::new(), 0.0);
        let fresh = registry.start("fresh", MetricCategory::Ui, Details::new(), 900.0);

        registry.start("trigger", MetricCategory::Ui, Details::new(), 1_500.0);

        assert!(!registry.is_open(&stale));
        assert!(registry.is_open(&fresh));
        assert_eq!(registry.open_count(), 2);
    }
}
