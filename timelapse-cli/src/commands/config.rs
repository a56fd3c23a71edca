//! Config command - inspect configuration files

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use timelapse_core::config::sample_config;
use timelapse_core::Catalog;

use super::Settings;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print a sample configuration to stdout
    Sample,

    /// Validate the configuration and show what it resolves to
    Check,
}

/// Run config subcommand
pub fn config(args: ConfigArgs, settings: &Settings) -> Result<()> {
    match args.command {
        ConfigCommand::Sample => {
            print!("{}", sample_config());
        }
        ConfigCommand::Check => {
            let config = settings.load()?;
            let catalog = Catalog::build(&config.groups).context("Failed to build video catalog")?;

            println!("Configuration file: {}\n", settings.config_path.display());
            println!("Server:");
            println!("  Listen:    {}:{}", config.server.bind, config.server.port);
            println!("  Schedule:  {}", config.server.cron_spec);
            println!("  Overlap:   {}", config.server.overlap);
            println!();
            println!("Encoder:");
            println!("  ffmpeg:    {}", config.encoder.ffmpeg.display());
            println!("  Codec:     {} ({})", config.encoder.codec, config.encoder.pixel_format);
            if config.encoder.timeout_secs > 0 {
                println!("  Timeout:   {}s", config.encoder.timeout_secs);
            }
            println!();

            for group in &config.groups {
                println!("Group '{}' ({})", group.name, group.display_title());
                println!("  Frames:    {}", group.pattern);
                println!("  Output:    {}", group.save_path.display());
                let names: Vec<String> = group.fps.iter().map(|&fps| group.video_name(fps)).collect();
                println!("  Videos:    {}", names.join(", "));
            }

            println!("\nOK: {} groups, {} videos", config.groups.len(), catalog.len());
        }
    }

    Ok(())
}
