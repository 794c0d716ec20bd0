//! # Lava Coverage CLI (`lava`)
//!
//! The `lava` binary instruments an application source tree with coverage
//! probes before a test session.
//!
//! ## Usage
//!
//! ```bash
//! lava --config ./lava.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lava detect` | List the sources and templates a run would touch |
//! | `lava instrument` | Inject probes into the configured source root |
//! | `lava match --mode <mode> "<line>"` | Show how a single line is classified |
//!
//! ## Examples
//!
//! ```bash
//! # Preview without touching files
//! lava instrument --dry-run --config ./lava.toml
//!
//! # Instrument and write the upload manifest
//! lava instrument --manifest ./lava-manifest.json
//!
//! # Check a line against the Unity table
//! lava match --mode unity "void Update() {"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lava_coverage::models::Mode;
use lava_coverage::progress::ProgressMode;
use lava_coverage::{config, discover, instrument, run};

/// Lava Coverage CLI: coverage probe injection for web, Angular, and Unity
/// sources.
///
/// Commands that read a project accept a `--config` flag pointing to a TOML
/// configuration file.
#[derive(Parser)]
#[command(
    name = "lava",
    about = "Lava Coverage: inject coverage probes into web, Angular, and Unity sources",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./lava.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered source files and templates.
    ///
    /// Shows which files would be line-scanned, which are excluded, and
    /// which are handled specially (Angular bootstrap, runtime module).
    Detect,

    /// Instrument the configured source root.
    ///
    /// Refuses to run twice over the same tree: a guard file is written to
    /// the source root at the end of a successful run.
    Instrument {
        /// Scan and report without writing, reformatting, or copying assets.
        #[arg(long)]
        dry_run: bool,

        /// Write the run manifest (records, probes, original contents) here.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Progress output: off, human (stderr), or json (stderr).
        /// Defaults to human on a TTY, off otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Classify one line and print the rewritten text.
    ///
    /// Does not read the configuration file.
    Match {
        #[arg(long, value_enum)]
        mode: Mode,

        /// Source line to classify.
        line: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lava_coverage=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    if let Commands::Match { mode, line } = &cli.command {
        instrument::run_match(*mode, line)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Detect => {
            discover::list_detected(&cfg)?;
        }
        Commands::Instrument {
            dry_run,
            manifest,
            progress,
        } => {
            run::run_instrument(&cfg, dry_run, manifest.as_deref(), progress)?;
        }
        Commands::Match { .. } => {}
    }

    Ok(())
}
