//! Timelapse CLI
//!
//! Turns directories of still frames into timelapse videos on a schedule and
//! streams them over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Generate at startup and every minute, serve on :8080
//! timelapse --config-path ./data/config.json
//!
//! # Run a single generation pass
//! timelapse generate
//!
//! # Show which videos the server knows about
//! timelapse list
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timelapse_core::TimelapseError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Timelapse - scheduled timelapse generation and streaming
#[derive(Parser)]
#[command(name = "timelapse")]
#[command(version)]
#[command(about = "Generate timelapse videos from frame directories and stream them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (JSON group list, JSON or TOML document)
    #[arg(long, global = true, env = "CONFIG_PATH", default_value = "./data/config.json")]
    config_path: PathBuf,

    /// Cron expression with a leading seconds field [default: "0 */1 * * * *"]
    #[arg(long, global = true, env = "CRON_SPEC")]
    cron_spec: Option<String>,

    /// HTTP port [default: 8080]
    #[arg(long, global = true, env = "PORT")]
    port: Option<u16>,

    /// Debug logging with source locations
    #[arg(long, global = true, env = "DEBUG")]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate on startup and on schedule, and serve videos over HTTP
    Serve,

    /// Run one generation pass and exit
    #[command(alias = "gen")]
    Generate,

    /// List the videos in the catalog
    #[command(alias = "ls")]
    List,

    /// Inspect configuration
    Config(commands::ConfigArgs),
}

fn init_logging(verbose: u8, debug: bool) -> anyhow::Result<()> {
    let level = match (verbose, debug) {
        (0, false) => Level::INFO,
        (0, true) | (1, _) => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("timelapse={}", level).parse()?)
        .add_directive(format!("timelapse_core={}", level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(debug)
        .with_line_number(debug)
        .init();

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.verbose, cli.debug)?;

    let settings = commands::Settings {
        config_path: cli.config_path,
        cron_spec: cli.cron_spec,
        port: cli.port,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve(&settings).await?,
        Commands::Generate => commands::generate(&settings).await?,
        Commands::List => commands::list(&settings)?,
        Commands::Config(args) => commands::config(args, &settings)?,
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start the async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli));

    // An abandoned generation pass must not hold up exit
    runtime.shutdown_background();

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);

        let hint = err
            .chain()
            .find_map(|e| e.downcast_ref::<TimelapseError>())
            .and_then(TimelapseError::user_hint);
        if let Some(hint) = hint {
            eprintln!("Hint: {}", hint);
        }

        std::process::exit(1);
    }
}
