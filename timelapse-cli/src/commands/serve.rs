//! Serve command - scheduled generation plus the HTTP stream server

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use timelapse_core::{
    scheduler::parse_schedule, server, Catalog, FfmpegEncoder, Generator, Scheduler,
};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::Settings;

/// Generate on startup and on schedule while serving videos until Ctrl+C
pub async fn serve(settings: &Settings) -> Result<()> {
    let config = settings.load()?;

    let catalog = Arc::new(Catalog::build(&config.groups).context("Failed to build video catalog")?);
    info!("Catalog holds {} videos", catalog.len());

    let schedule = parse_schedule(&config.server.cron_spec)?;

    let encoder = FfmpegEncoder::new(config.encoder.clone());
    if !encoder.available() {
        warn!(
            "{:?} could not be run; generation will fail until it is installed",
            encoder.settings().ffmpeg
        );
    }

    let scheduler = Arc::new(
        Scheduler::new(config.groups.clone(), Generator::new(Arc::new(encoder)))
            .with_overlap(config.server.overlap),
    );

    // A port we cannot bind is fatal, before any generation starts
    let addr = SocketAddr::new(config.server.bind, config.server.port);
    let listener = server::bind(addr).await?;

    let (shutdown_tx, _) = broadcast::channel(1);

    scheduler.trigger("startup");
    let cron = tokio::spawn(Arc::clone(&scheduler).run_cron(schedule, shutdown_tx.subscribe()));
    info!(
        "Generating on schedule '{}' (overlap policy: {})",
        config.server.cron_spec, config.server.overlap
    );

    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received interrupt signal, shutting down"),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
            let _ = shutdown_tx.send(());
        });
    }

    let result = server::serve(listener, server::router(catalog), shutdown_tx.subscribe()).await;

    // Stop scheduling even if the server failed on its own, and drop
    // triggers still queued on the gate
    let _ = shutdown_tx.send(());
    scheduler.stop();
    if let Err(e) = cron.await {
        warn!("Schedule task ended abnormally: {}", e);
    }

    if scheduler.gate().is_busy() {
        info!("Waiting for the running generation pass to finish (Ctrl+C again to abort)");
        tokio::select! {
            _ = scheduler.gate().acquire() => {}
            _ = signal::ctrl_c() => {
                warn!("Abandoning generation pass; its temporary files may remain")
            }
        }
    }

    result.context("HTTP server failed")?;
    info!("Stopped");
    Ok(())
}
