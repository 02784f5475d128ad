//! Telemetry domain types.
//!
//! Records produced by the telemetry agent and the host capabilities it
//! samples through. The agent itself lives in `colloq-telemetry`.

mod capability;
mod metric;
mod summary;

pub use capability::{
    FixedMemoryProbe, FrameClock, HeapUsage, ManualClock, MemoryProbe, NoMemoryProbe, SystemClock,
};
pub use metric::{Details, MemorySnapshot, Metric, MetricCategory, SIMULATED_LATENCY_KEY};
pub use summary::{MetricsExport, MetricsSummary, SLOWEST_LIMIT};
