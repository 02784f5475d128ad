//! Runtime telemetry for the chat client.
//!
//! Times arbitrary operations, samples frame cadence and memory pressure,
//! and aggregates completed spans into on-demand summaries.
//!
//! Construct one [`TelemetryAgent`] at startup and share it (`Arc`) with every
//! component that needs to time work.

pub mod agent;
pub mod aggregator;
pub mod broadcast;
pub mod forwarder;
pub mod sampler;
pub mod timer;

pub use agent::{SpanGuard, TelemetryAgent, spawn_memory_sampler};
pub use aggregator::MetricsAggregator;
pub use broadcast::{BroadcastChannel, Listener, Subscription};
pub use sampler::{FrameCadenceSampler, MemorySampler};
pub use timer::{OpenTimer, TimerId, TimerRegistry};
