//! Frame-cadence and memory-pressure samplers.
//!
//! Both do constant work per tick; they are driven by the host (frame
//! callbacks) or by [`crate::spawn_memory_sampler`].

use colloq_core::telemetry::{MemoryProbe, MemorySnapshot};
use std::sync::Arc;

/// Counts frame callbacks and converts them to frames per second once per window.
#[derive(Debug)]
pub struct FrameCadenceSampler {
    window_ms: f64,
    frames: u64,
    window_start_ms: f64,
    cadence_fps: f64,
}

impl FrameCadenceSampler {
    pub fn new(window_ms: u64, now_ms: f64) -> Self {
        Self {
            window_ms: window_ms as f64,
            frames: 0,
            window_start_ms: now_ms,
            cadence_fps: 0.0,
        }
    }

    /// Records one frame callback. Returns the new cadence when the window closed.
    pub fn record_frame(&mut self, now_ms: f64) -> Option<f64> {
        self.frames += 1;

        let elapsed = now_ms - self.window_start_ms;
        if elapsed < self.window_ms || elapsed <= 0.0 {
            return None;
        }

        self.cadence_fps = self.frames as f64 * 1000.0 / elapsed;
        self.frames = 0;
        self.window_start_ms = now_ms;
        Some(self.cadence_fps)
    }

    /// Latest computed cadence; 0 until the first window closes.
    pub fn cadence_fps(&self) -> f64 {
        self.cadence_fps
    }
}

/// Reads heap usage through a [`MemoryProbe`] and warns on pressure.
pub struct MemorySampler {
    probe: Arc<dyn MemoryProbe>,
    warning_percent: f64,
    latest: MemorySnapshot,
    warnings: u64,
}

impl MemorySampler {
    pub fn new(probe: Arc<dyn MemoryProbe>, warning_percent: f64) -> Self {
        Self {
            probe,
            warning_percent,
            latest: MemorySnapshot::zeroed(),
            warnings: 0,
        }
    }

    /// Takes a reading. A probe that cannot report yields a zeroed snapshot.
    pub fn sample(&mut self) -> MemorySnapshot {
        let snapshot = self
            .probe
            .heap_usage()
            .map(|usage| MemorySnapshot::new(usage.used_bytes, usage.total_bytes))
            .unwrap_or_else(MemorySnapshot::zeroed);

        if snapshot.usage_percent > self.warning_percent {
            self.warnings += 1;
            tracing::warn!(
                used_bytes = snapshot.used_bytes,
                total_bytes = snapshot.total_bytes,
                "[MemorySampler] high memory usage: {:.1}%",
                snapshot.usage_percent
            );
        }

        self.latest = snapshot;
        snapshot
    }

    pub fn latest(&self) -> MemorySnapshot {
        self.latest
    }

    /// Readings that crossed the warning threshold so far.
    pub fn warning_count(&self) -> u64 {
        self.warnings
    }
}

impl std::fmt::Debug for MemorySampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySampler")
            .field("warning_percent", &self.warning_percent)
            .field("latest", &self.latest)
            .field("warnings", &self.warnings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloq_core::telemetry::{FixedMemoryProbe, HeapUsage, NoMemoryProbe};

    #[test]
    fn test_cadence_computed_after_window() {
        let mut sampler = FrameCadenceSampler::new(1000, 0.0);

        for i in 1..60 {
            assert_eq!(sampler.record_frame(i as f64 * 16.0), None);
        }
        assert_eq!(sampler.cadence_fps(), 0.0);

        // 60th frame lands past the window
        let fps = sampler.record_frame(1_200.0).unwrap();
        assert!((fps - 50.0).abs() < 1e-9);
        assert_eq!(sampler.cadence_fps(), fps);
    }

    #[test]
    fn test_cadence_counter_resets() {
        let mut sampler = FrameCadenceSampler::new(1000, 0.0);
        sampler.record_frame(1_000.0).unwrap();
        assert_eq!(sampler.record_frame(1_500.0), None);
        let fps = sampler.record_frame(2_000.0).unwrap();
        assert!((fps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_probe_yields_zeroed_snapshot() {
        let mut sampler = MemorySampler::new(Arc::new(NoMemoryProbe), 80.0);
        assert_eq!(sampler.sample(), MemorySnapshot::zeroed());
    }

    #[test]
    fn test_probe_reading_is_kept_as_latest() {
        let probe = FixedMemoryProbe(HeapUsage {
            used_bytes: 900,
            total_bytes: 1_000,
        });
        let mut sampler = MemorySampler::new(Arc::new(probe), 80.0);

        let snapshot = sampler.sample();
        assert!((snapshot.usage_percent - 90.0).abs() < 1e-9);
        assert_eq!(sampler.latest(), snapshot);
    }

    #[test]
    fn test_warning_only_above_threshold() {
        let at_threshold = FixedMemoryProbe(HeapUsage {
            used_bytes: 800,
            total_bytes: 1_000,
        });
        let mut sampler = MemorySampler::new(Arc::new(at_threshold), 80.0);
        sampler.sample();
        assert_eq!(sampler.warning_count(), 0);

        let high = FixedMemoryProbe(HeapUsage {
            used_bytes: 810,
            total_bytes: 1_000,
        });
        let mut sampler = MemorySampler::new(Arc::new(high), 80.0);
        sampler.sample();
        sampler.sample();
        assert_eq!(sampler.warning_count(), 2);
    }

    #[test]
    fn test_missing_probe_never_warns() {
        let mut sampler = MemorySampler::new(Arc::new(NoMemoryProbe), 0.0);
        sampler.sample();
        assert_eq!(sampler.warning_count(), 0);
    }
}
