//! Generate command - one pass, then exit

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use timelapse_core::generate::RenderOutcome;
use timelapse_core::{FfmpegEncoder, Generator, Scheduler};

use super::Settings;

/// Run a single generation pass and print what happened to every group
pub async fn generate(settings: &Settings) -> Result<()> {
    let config = settings.load()?;

    let encoder = FfmpegEncoder::new(config.encoder.clone());
    let scheduler = Scheduler::new(config.groups, Generator::new(Arc::new(encoder)));

    let report = tokio::task::spawn_blocking(move || scheduler.run_pass())
        .await
        .context("Generation task panicked")?
        .context("Generation pass was skipped")?;

    println!("Timelapse - Generation Summary\n");
    println!("{:<24} {:>7}  {:<6} {}", "Group", "Frames", "FPS", "Result");
    println!("{}", "-".repeat(75));

    for group in &report.groups {
        if group.is_skipped() {
            println!("{:<24} {:>7}  {:<6} no frames", super::truncate(&group.group, 24), 0, "-");
            continue;
        }
        for render in &group.renders {
            let result = match &render.outcome {
                RenderOutcome::Published(path) => format!("published {}", path.display()),
                RenderOutcome::EncodeFailed(reason) => format!("encode failed: {}", reason),
                RenderOutcome::PublishFailed { temp, reason } => {
                    format!("publish failed ({} kept): {}", temp.display(), reason)
                }
            };
            println!(
                "{:<24} {:>7}  {:<6} {}",
                super::truncate(&group.group, 24),
                group.frames,
                render.fps,
                result
            );
        }
    }

    println!(
        "\n{} published, {} failed, {} groups without frames ({:.1}s)",
        report.published(),
        report.failed(),
        report.skipped(),
        report.elapsed.as_secs_f64()
    );

    if report.failed() > 0 {
        bail!("{} videos failed to generate", report.failed());
    }
    Ok(())
}
