use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arkiv",
    version,
    about = "Reconcile local data files with a remote catalog",
    after_help = "\
Configuration file lookup order:
  1. --config <path>             (explicit flag)
  2. $ARKIV_CONFIG               (environment variable)
  3. ./arkiv.yaml                (project)
  4. $XDG_CONFIG_HOME/arkiv/config.yaml or ~/.config/arkiv/config.yaml (user)
  5. /etc/arkiv/config.yaml      (system)

Environment variables:
  ARKIV_CONFIG      Path to configuration file (overrides default search)"
)]
pub(crate) struct Cli {
    /// Path to configuration file (overrides ARKIV_CONFIG and default search)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Bring the catalog in line with the configured sources
    Run {
        /// Number of parallel transfer workers (overrides config)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Minimum wall time per transfer attempt, e.g. "2s" or "500ms"
        #[arg(long)]
        min_attempt: Option<String>,

        /// Query and plan, then stop before changing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show what a run would change
    Plan,

    /// Generate a starter configuration file
    Config {
        /// Destination path (default: ./arkiv.yaml)
        #[arg(short, long)]
        dest: Option<String>,
    },
}
