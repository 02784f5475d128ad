//! Host capabilities the telemetry agent samples through.
//!
//! Browser-only primitives (animation-frame timestamps, heap statistics) are
//! hidden behind [`FrameClock`] and [`MemoryProbe`] so any host can supply a
//! real implementation or a stub.

use std::sync::Mutex;
use std::time::Instant;

/// Time source for span durations, cadence and metric timestamps.
pub trait FrameClock: Send + Sync {
    /// Monotonic reading in milliseconds. Only differences are meaningful.
    fn monotonic_ms(&self) -> f64;

    /// Wall-clock reading in epoch milliseconds.
    fn wall_ms(&self) -> i64;
}

/// Heap usage as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Optional heap-usage capability.
pub trait MemoryProbe: Send + Sync {
    /// `None` when the host cannot report heap usage.
    fn heap_usage(&self) -> Option<HeapUsage>;
}

/// [`FrameClock`] backed by `Instant` and the system clock.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn monotonic_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn wall_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for hosts that replay recorded frames, and for tests.
///
/// Monotonic and wall readings advance together.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(f64, i64)>,
}

impl ManualClock {
    /// Starts at monotonic 0 and the given wall-clock epoch milliseconds.
    pub fn new(wall_start_ms: i64) -> Self {
        Self {
            state: Mutex::new((0.0, wall_start_ms)),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.0 += ms as f64;
        state.1 += ms as i64;
    }
}

impl FrameClock for ManualClock {
    fn monotonic_ms(&self) -> f64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).0
    }

    fn wall_ms(&self) -> i64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).1
    }
}

/// Probe for hosts without heap statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn heap_usage(&self) -> Option<HeapUsage> {
        None
    }
}

/// Probe that always reports the same reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub HeapUsage);

impl MemoryProbe for FixedMemoryProbe {
    fn heap_usage(&self) -> Option<HeapUsage> {
        Some(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_both_readings() {
        let clock = ManualClock::new(1_000);
        clock.advance_ms(250);
        assert_eq!(clock.monotonic_ms(), 250.0);
        assert_eq!(clock.wall_ms(), 1_250);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.monotonic_ms();
        let b = clock.monotonic_ms();
        assert!(b >= a);
        assert!(clock.wall_ms() > 0);
    }
}
