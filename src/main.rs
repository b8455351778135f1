//! CLI entry point for the clustering service.
//!
//! Provides commands for serving the HTTP API, writing a settings template
//! and running offline experiments.

use anyhow::Context;
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use clusterlab::Settings;
use clusterlab::display::{create_clusters_table, create_distances_table};
use clusterlab::experiment::{Experiment, RunOptions};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Online clustering service
#[derive(Parser)]
#[command(
    name = "clusterlab",
    version = env!("CARGO_PKG_VERSION"),
    about = "Online clustering service",
    long_about = "Feed points and seed centers into named areas and refine them with Lloyd iterations.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    #[command(about = "Start the HTTP clustering service")]
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Initialize project
    #[command(about = "Write .clusterlab/settings.toml with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Run an experiment file offline
    #[command(
        about = "Cluster points from a JSON file and print the result",
        after_help = "Experiment file:\n  {\"points\": [[1, 1], [9, 9]], \"clusters\": [[0, 0], [10, 10]], \"dist_id\": 1, \"max_age\": 100}"
    )]
    Run {
        /// Path to the experiment JSON file
        file: PathBuf,

        /// Distance function id (overrides the file)
        #[arg(short, long)]
        dist: Option<i64>,

        /// Iteration budget (overrides the file)
        #[arg(short, long)]
        max_age: Option<i64>,

        /// Perform a single iteration only
        #[arg(long)]
        step: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the distance function catalog
    #[command(about = "Show available distance functions")]
    Distances,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("Configuration error loading from {}: {e}", path.display())
        })?,
        None => Settings::load().map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?,
    };
    Ok(settings)
}

fn init_logging(settings: &Settings, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        settings.log_level()
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_settings(&cli)?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve { bind } => {
            let bind_address = bind.unwrap_or_else(|| config.server.bind.clone());
            clusterlab::http::serve_http(config, bind_address).await?;
        }

        Commands::Init { force } => {
            let root = std::env::current_dir().context("Cannot determine current directory")?;
            let path = Settings::init_config_file(root, force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created configuration file at: {}", path.display());
        }

        Commands::Run {
            file,
            dist,
            max_age,
            step,
            json,
        } => {
            let experiment = Experiment::load(&file)?;
            let options = RunOptions {
                dist_id: dist,
                max_age,
                by_step: step,
            };
            let outcome = experiment.run(options, &config.training)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", create_clusters_table(&outcome));
            }
        }

        Commands::Distances => {
            println!("{}", create_distances_table());
        }
    }

    Ok(())
}
