use anyhow::{Context, Result};
use colloq_application::{ChatService, SessionStore};
use colloq_core::config::ColloqConfig;
use colloq_core::session::{DeliveryState, TransportError};
use colloq_core::telemetry::{MetricCategory, SystemClock};
use colloq_infrastructure::{ColloqPaths, InMemoryTransport, SysinfoMemoryProbe};
use colloq_telemetry::{TelemetryAgent, spawn_memory_sampler};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct DemoOptions {
    pub messages: usize,
    pub latency_ms: u64,
    pub fail: bool,
    pub output: Option<PathBuf>,
}

/// `metrics-<timestamp>.json` under the exports directory.
pub fn default_export_path() -> Result<PathBuf> {
    let dir = ColloqPaths::exports_dir()?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    Ok(dir.join(format!("metrics-{stamp}.json")))
}

pub async fn run(config: ColloqConfig, options: DemoOptions) -> Result<()> {
    let telemetry = Arc::new(TelemetryAgent::new(
        config.telemetry.clone(),
        Arc::new(SystemClock::new()),
        Arc::new(SysinfoMemoryProbe::new()),
    ));
    let sampler = spawn_memory_sampler(telemetry.clone());

    let (subscription, mut stream) = telemetry.metric_stream();
    let printer = tokio::spawn(async move {
        while let Some(metric) = stream.recv().await {
            eprintln!(
                "  {:<16} {:>9.2}ms  [{}]",
                metric.operation, metric.duration_ms, metric.category
            );
        }
    });

    let transport = Arc::new(
        InMemoryTransport::new().with_latency(Duration::from_millis(options.latency_ms)),
    );
    transport.seed_session(
        "Welcome",
        &[("What can you do?", "I answer questions about your documents.")],
    );

    let chat = ChatService::new(
        transport.clone(),
        Arc::new(SessionStore::new(config.cache.clone())),
        telemetry.clone(),
    );

    let sessions = chat.load_sessions().await?;
    eprintln!("Loaded {} session(s)", sessions.len());
    if let Some(seeded) = sessions.first() {
        chat.get_or_fetch_messages(&seeded.id).await?;
        // Served from the cache: no second request reaches the backend.
        chat.get_or_fetch_messages(&seeded.id).await?;
    }

    let session = chat.create_session("Demo chat").await?;
    for n in 0..options.messages {
        if options.fail && n == 1 {
            transport.fail_next(TransportError::with_payload(
                Some(429),
                json!({ "detail": "quota exceeded" }),
            ));
        }

        let receipt = chat
            .send_message(&session.id, &format!("Question {}", n + 1))
            .await?;
        match &receipt.state {
            DeliveryState::Confirmed => eprintln!("Sent: {}", receipt.reply.content),
            DeliveryState::Failed { error } => eprintln!("Failed: {error}"),
            other => eprintln!("Unsettled: {other:?}"),
        }
        telemetry.record_frame();
    }

    {
        let _render = telemetry.span("render_session_list", MetricCategory::Render, None);
        let reconciled = chat.load_sessions().await?;
        eprintln!("Reconciled {} session(s)", reconciled.len());
    }

    let stats = chat.store().cache_stats().await;
    let cached_sessions = chat
        .store()
        .inspect(|state| state.cache().session_count())
        .await;
    eprintln!(
        "Cache: {} session(s), {} hit(s), {} miss(es), {} eviction(s); backend saw {} request(s)",
        cached_sessions,
        stats.hits,
        stats.misses,
        stats.evictions,
        transport.call_count()
    );

    subscription.unsubscribe();
    sampler.abort();
    printer.await.context("metric printer task failed")?;

    let export = telemetry.export_metrics()?;
    match options.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, export)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Metrics written to {}", path.display());
        }
        None => println!("{export}"),
    }

    Ok(())
}
