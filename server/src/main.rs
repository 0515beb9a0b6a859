use anyhow::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pulse_core::MetricHasher;
use server::api::ApiServer;
use server::backup::FileBackuper;
use server::config::ServerConfig;
use server::service::MetricsService;
use server::storage::{MemoryRepository, Pingable};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::load().context("failed to load server configuration")?;
    info!("Starting pulse server on {}", cfg.address);

    let repo = Arc::new(MemoryRepository::new());
    let service = Arc::new(MetricsService::new(repo.clone()));
    let backuper = Arc::new(FileBackuper::new(&cfg.backup.path));

    // Data integrity over availability: a corrupt snapshot stops the boot.
    if cfg.backup.restore {
        service
            .restore_from(&backuper)
            .await
            .context("failed to restore metrics from backup")?;
    }

    let shutdown = CancellationToken::new();
    let backup_handle = (!cfg.backup.interval.is_zero()).then(|| {
        service.spawn_backup_task(
            Arc::clone(&backuper),
            cfg.backup.interval,
            shutdown.clone(),
        )
    });

    let hasher = MetricHasher::new(&cfg.hash_key);
    let pingables: Vec<Arc<dyn Pingable>> = vec![repo];
    let api = ApiServer::new(cfg.address.as_str(), Arc::clone(&service), hasher, pingables);

    let http_server = api.start().context("failed to bind API server")?;
    let server_handle = http_server.handle();
    let server_task = tokio::spawn(http_server);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down...");
    shutdown.cancel();

    let drained = tokio::time::timeout(cfg.shutdown_timeout, async {
        server_handle.stop(true).await;
        if let Some(handle) = backup_handle {
            let _ = handle.await;
        }
        let _ = server_task.await;
    })
    .await;

    if drained.is_err() {
        error!(
            "Shutdown exceeded force-stop timeout of {:?}, terminating",
            cfg.shutdown_timeout
        );
        std::process::exit(1);
    }

    info!("Server stopped cleanly");
    Ok(())
}
