use arkiv_core::config::{parse_human_duration, ArkivConfig};
use arkiv_core::commands::run::RunOptions;

use crate::cli::Commands;
use crate::cmd;

pub(crate) fn dispatch_command(
    command: &Commands,
    cfg: &ArkivConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            workers,
            min_attempt,
            dry_run,
        } => {
            let min_attempt = min_attempt
                .as_deref()
                .map(parse_human_duration)
                .transpose()?;
            let opts = RunOptions {
                workers: *workers,
                min_attempt,
                dry_run: *dry_run,
            };
            cmd::run::run(cfg, &opts)
        }
        Commands::Plan => cmd::plan::run(cfg),
        Commands::Config { .. } => unreachable!("handled before config resolution"),
    }
}
