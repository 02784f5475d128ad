//! The telemetry agent: one instance per application, passed by reference.
//!
//! `TelemetryAgent` ties together the timer registry, the two samplers, the
//! metrics log and the broadcast channel. Every method is synchronous and
//! holds each internal lock only for the duration of a map or vector update;
//! no lock is held while subscribers run.

use crate::aggregator::MetricsAggregator;
use crate::broadcast::{BroadcastChannel, Subscription};
use crate::forwarder;
use crate::sampler::{FrameCadenceSampler, MemorySampler};
use crate::timer::{TimerId, TimerRegistry};
use colloq_core::config::TelemetryConfig;
use colloq_core::error::Result;
use colloq_core::telemetry::{
    Details, FrameClock, MemoryProbe, MemorySnapshot, Metric, MetricCategory, MetricsExport,
    MetricsSummary, NoMemoryProbe, SIMULATED_LATENCY_KEY, SystemClock,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct TelemetryAgent {
    config: TelemetryConfig,
    clock: Arc<dyn FrameClock>,
    timers: Mutex<TimerRegistry>,
    cadence: Mutex<FrameCadenceSampler>,
    memory: Mutex<MemorySampler>,
    log: Mutex<MetricsAggregator>,
    channel: BroadcastChannel,
}

impl TelemetryAgent {
    /// Creates an agent and takes an initial memory reading.
    pub fn new(
        config: TelemetryConfig,
        clock: Arc<dyn FrameClock>,
        probe: Arc<dyn MemoryProbe>,
    ) -> Self {
        let now = clock.monotonic_ms();
        let mut memory = MemorySampler::new(probe, config.memory_warning_percent);
        memory.sample();

        Self {
            timers: Mutex::new(TimerRegistry::with_max_age(config.max_open_timer_age_ms)),
            cadence: Mutex::new(FrameCadenceSampler::new(config.cadence_window_ms, now)),
            memory: Mutex::new(memory),
            log: Mutex::new(MetricsAggregator::new()),
            channel: BroadcastChannel::new(),
            clock,
            config,
        }
    }

    /// Agent on the system clock with no memory probe.
    pub fn with_defaults() -> Self {
        Self::new(
            TelemetryConfig::default(),
            Arc::new(SystemClock::new()),
            Arc::new(NoMemoryProbe),
        )
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    // ============================================================================
    // Spans
    // ============================================================================

    pub fn start_timer(
        &self,
        operation: impl Into<String>,
        category: MetricCategory,
        details: Option<Details>,
    ) -> TimerId {
        let now = self.clock.monotonic_ms();
        lock(&self.timers).start(operation, category, details.unwrap_or_default(), now)
    }

    /// Ends a span, logs its metric and notifies subscribers.
    ///
    /// Returns `None` (after a warning) for unknown or already-ended ids.
    pub fn end_timer(&self, id: &TimerId, extra: Option<Details>) -> Option<Metric> {
        let now = self.clock.monotonic_ms();
        let timer = lock(&self.timers).finish(id)?;

        let mut details = timer.details;
        if let Some(extra) = extra {
            details.extend(extra);
        }
        let simulated_latency_ms = details
            .get(SIMULATED_LATENCY_KEY)
            .and_then(serde_json::Value::as_f64);

        let metric = Metric {
            timestamp: self.clock.wall_ms(),
            duration_ms: (now - timer.started_at_ms).max(0.0),
            operation: timer.operation,
            category: timer.category,
            details,
            memory: self.current_memory(),
            cadence_fps: self.current_cadence(),
            simulated_latency_ms,
        };

        tracing::debug!(
            "[TelemetryAgent] {} ({}) took {:.2}ms",
            metric.operation,
            metric.category,
            metric.duration_ms
        );

        lock(&self.log).append(metric.clone());
        self.channel.publish(&metric);
        Some(metric)
    }

    /// Starts a span that ends itself when dropped.
    pub fn span(
        &self,
        operation: impl Into<String>,
        category: MetricCategory,
        details: Option<Details>,
    ) -> SpanGuard<'_> {
        SpanGuard {
            agent: self,
            id: Some(self.start_timer(operation, category, details)),
        }
    }

    pub fn open_timer_count(&self) -> usize {
        lock(&self.timers).open_count()
    }

    // ============================================================================
    // Samplers
    // ============================================================================

    /// Call from every animation-frame (render) callback.
    pub fn record_frame(&self) -> Option<f64> {
        let now = self.clock.monotonic_ms();
        lock(&self.cadence).record_frame(now)
    }

    pub fn sample_memory(&self) -> MemorySnapshot {
        lock(&self.memory).sample()
    }

    pub fn current_cadence(&self) -> f64 {
        lock(&self.cadence).cadence_fps()
    }

    pub fn current_memory(&self) -> MemorySnapshot {
        lock(&self.memory).latest()
    }

    pub fn memory_warning_count(&self) -> u64 {
        lock(&self.memory).warning_count()
    }

    // ============================================================================
    // Subscribers
    // ============================================================================

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Metric) + Send + Sync + 'static,
    {
        self.channel.subscribe(listener)
    }

    /// Streams every future metric onto a tokio channel.
    pub fn metric_stream(&self) -> (Subscription, mpsc::UnboundedReceiver<Metric>) {
        forwarder::forward_to_channel(&self.channel)
    }

    // ============================================================================
    // Aggregation
    // ============================================================================

    pub fn summarize(&self, window_ms: u64) -> MetricsSummary {
        let cadence = self.current_cadence();
        let memory = self.current_memory();
        let now = self.clock.wall_ms();
        lock(&self.log).summarize(window_ms, now, cadence, memory)
    }

    /// Summary over the configured default window.
    pub fn summarize_recent(&self) -> MetricsSummary {
        self.summarize(self.config.default_summary_window_ms)
    }

    /// Snapshot of the full log plus a default-window summary.
    pub fn export(&self) -> MetricsExport {
        let summary = self.summarize_recent();
        let metrics = lock(&self.log).metrics().to_vec();
        MetricsExport {
            metrics,
            summary,
            exported_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Pretty-printed JSON of [`TelemetryAgent::export`].
    pub fn export_metrics(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    pub fn metric_count(&self) -> usize {
        lock(&self.log).len()
    }

    pub fn clear_metrics(&self) {
        lock(&self.log).clear();
    }
}

impl std::fmt::Debug for TelemetryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryAgent")
            .field("config", &self.config)
            .field("open_timers", &self.open_timer_count())
            .field("metrics", &self.metric_count())
            .field("channel", &self.channel)
            .finish()
    }
}

/// Span that ends when dropped, unless finished explicitly first.
#[must_use = "dropping the guard immediately ends the span"]
pub struct SpanGuard<'a> {
    agent: &'a TelemetryAgent,
    id: Option<TimerId>,
}

impl SpanGuard<'_> {
    pub fn id(&self) -> Option<&TimerId> {
        self.id.as_ref()
    }

    /// Ends the span with extra details and returns its metric.
    pub fn finish(mut self, extra: Option<Details>) -> Option<Metric> {
        let id = self.id.take()?;
        self.agent.end_timer(&id, extra)
    }
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.agent.end_timer(&id, None);
        }
    }
}

/// Samples memory every `memory_interval_ms` until the task is aborted.
pub fn spawn_memory_sampler(agent: Arc<TelemetryAgent>) -> JoinHandle<()> {
    let period = Duration::from_millis(agent.config().memory_interval_ms.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            agent.sample_memory();
        }
    })
}
