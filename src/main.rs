//! # tds2stac CLI
//!
//! The `tds2stac` binary harvests a THREDDS catalog hierarchy into a
//! self-contained STAC catalog.
//!
//! ## Usage
//!
//! ```bash
//! tds2stac --config ./config/tds2stac.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tds2stac count <url>` | Count branches and datasets below a catalog |
//! | `tds2stac harvest <url>` | Build the STAC catalog and write it to disk |
//!
//! Logging is controlled with `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tds_stac::config;
use tds_stac::harvest::{self, HarvestOptions};
use tds_stac::progress::ProgressMode;

/// tds2stac: harvest THREDDS catalogs into STAC.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tds2stac.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tds2stac",
    about = "Harvest a THREDDS Data Server catalog into a STAC catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tds2stac.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/tds2stac.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a catalog and write it as STAC.
    ///
    /// Runs the counter pass, then the build pass, and writes the catalog
    /// tree when an output directory is given here or in the config.
    Harvest {
        /// Root THREDDS catalog URL (`catalog.html` or `catalog.xml`).
        url: String,

        /// Output directory (overrides `output.dir`).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Id of the root STAC catalog (overrides `output.catalog_id`).
        #[arg(long)]
        id: Option<String>,

        /// Description of the root STAC catalog.
        #[arg(long)]
        description: Option<String>,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Count branches and datasets without building anything.
    Count {
        /// Root THREDDS catalog URL.
        url: String,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Harvest {
            url,
            out,
            id,
            description,
            progress,
        } => {
            let options = HarvestOptions {
                out,
                catalog_id: id,
                description,
            };
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            harvest::run_harvest(&cfg, &url, options, mode).await?;
        }
        Commands::Count { url, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            harvest::run_count(&cfg, &url, mode).await?;
        }
    }

    Ok(())
}
