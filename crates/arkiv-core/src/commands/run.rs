use std::time::Duration;

use arkiv_store::StoreConnector;
use arkiv_types::error::Result;

use crate::config::ArkivConfig;
use crate::execute::execute;
use crate::reconcile::ActionPlan;
use crate::report::{log_observed, log_plan, log_summary, AuditLevel, AuditLog, RunSummary};
use crate::store::StoreClient;

/// Per-invocation overrides of the configured transfer settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub workers: Option<usize>,
    pub min_attempt: Option<Duration>,
    /// Stop after reconciliation.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub plan: ActionPlan,
    pub zero_size: usize,
    pub unmatched: usize,
    /// `None` for a dry run.
    pub summary: Option<RunSummary>,
}

/// Run `arkiv run`.
///
/// Fatal conditions (unreadable sources, naming collisions, catalog query
/// failures) return an error before any mutation. A run that fails while
/// reading its sources leaves only the error in the audit log. Once
/// execution starts, individual failures only show up in the summary.
pub fn run(
    config: &ArkivConfig,
    connector: &dyn StoreConnector,
    audit: &AuditLog,
    opts: &RunOptions,
) -> Result<RunReport> {
    let transfer = config
        .transfer
        .with_overrides(opts.workers, opts.min_attempt)?;

    let mut desired = match super::build_desired(config) {
        Ok(desired) => desired,
        Err(e) => {
            audit.error(format!("aborted: [{}] {e}", e.failure_kind()));
            return Err(e);
        }
    };

    audit.section(AuditLevel::Info, "run start");
    audit.info(format!("scope: {}", config.scope));
    audit.info(format!("upload location: {}", config.upload_location));
    audit.info(format!(
        "destination: {} x{}",
        config.destination_location, config.replicas
    ));
    audit.info(format!(
        "workers: {}  min attempt: {:?}  dry run: {}",
        transfer.workers, transfer.min_attempt, opts.dry_run
    ));
    for source in &config.sources {
        for path in &source.paths {
            audit.info(format!("source {:?}: {}", source.kind, path.display()));
        }
    }
    audit.end_section(AuditLevel::Info);

    let store = connector
        .connect()
        .inspect_err(|e| audit.error(format!("aborted: cannot connect: [{}] {e}", e.failure_kind())))?;
    let client = StoreClient::new(store.as_ref(), audit.clone());
    let plan = match super::plan_for(config, &client, &mut desired) {
        Ok(reconciliation) => {
            log_observed(audit, &desired, &reconciliation.observed);
            reconciliation.plan
        }
        Err(e) => {
            audit.error(format!("aborted: catalog query failed: [{}] {e}", e.failure_kind()));
            return Err(e);
        }
    };
    log_plan(audit, &desired, &plan);

    let summary = if opts.dry_run {
        audit.info("dry run: nothing changed");
        None
    } else {
        let summary = execute(&client, connector, &plan, &transfer, audit);
        log_summary(audit, &summary);
        Some(summary)
    };

    audit.section(AuditLevel::Info, "run complete");
    audit.end_section(AuditLevel::Info);

    Ok(RunReport {
        plan,
        zero_size: desired.zero_size.len(),
        unmatched: desired.unmatched,
        summary,
    })
}
