use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agent::buffer::MetricBuffer;
use agent::collectors::{PollCountCollector, RandomCollector, SystemCollector};
use agent::config::AgentConfig;
use agent::exporters::{HttpExporter, LogExporter};
use agent::scheduler::Agent;
use pulse_core::MetricHasher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = AgentConfig::load().context("failed to load agent configuration")?;
    info!(
        "Starting pulse agent: collect every {:?}, export every {:?} to {}",
        cfg.collect_interval, cfg.export_interval, cfg.exporter.address
    );

    let buffer = Arc::new(MetricBuffer::new());
    let mut agent = Agent::new(&cfg, Arc::clone(&buffer));

    agent.add_collector(Arc::new(SystemCollector::new("system")));
    agent.add_collector(Arc::new(PollCountCollector::new("poll-count")));
    agent.add_collector(Arc::new(
        RandomCollector::new("random", &cfg.random)
            .context("cannot start random collector")?,
    ));

    let hasher = (!cfg.hash_key.is_empty()).then(|| MetricHasher::new(&cfg.hash_key));
    agent.add_exporter(Arc::new(LogExporter::new("log")));
    agent.add_exporter(Arc::new(
        HttpExporter::new("http", &cfg.exporter, hasher)
            .context("cannot start http exporter")?,
    ));

    let agent = Arc::new(agent);
    let shutdown = CancellationToken::new();
    let run_handle = tokio::spawn(Arc::clone(&agent).run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down...");
    shutdown.cancel();

    // Drain all workers, bounded by the force-stop timeout.
    let drained = tokio::time::timeout(cfg.shutdown_timeout, async {
        agent.stop(cfg.shutdown_timeout).await;
        let _ = run_handle.await;
    })
    .await;

    if drained.is_err() {
        error!(
            "Shutdown exceeded force-stop timeout of {:?}, terminating",
            cfg.shutdown_timeout
        );
        std::process::exit(1);
    }

    info!("Agent stopped cleanly");
    Ok(())
}
