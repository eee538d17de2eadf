mod transfer;

pub use self::transfer::{partition_round_robin, run_transfers, TransferOutcome};

use arkiv_store::StoreConnector;

use crate::config::TransferConfig;
use crate::reconcile::ActionPlan;
use crate::report::{AuditLevel, AuditLog, RunSummary};
use crate::store::StoreClient;

/// Carry out a plan: attach, provision, transfer, summarize.
///
/// Individual failures are logged and counted; nothing here aborts the run.
pub fn execute(
    client: &StoreClient<'_>,
    connector: &dyn StoreConnector,
    plan: &ActionPlan,
    config: &TransferConfig,
    audit: &AuditLog,
) -> RunSummary {
    let attach_failures = attach_phase(client, plan, audit);
    let provision_failures = provision_phase(client, plan, audit);

    audit.section(AuditLevel::Info, "transfers");
    let outcomes = run_transfers(connector, plan.items_to_transfer.clone(), config, audit);
    audit.end_section(AuditLevel::Info);

    let mut summary = RunSummary::from_outcomes(&outcomes);
    summary.attach_failures = attach_failures;
    summary.provision_failures = provision_failures;
    summary
}

fn attach_phase(client: &StoreClient<'_>, plan: &ActionPlan, audit: &AuditLog) -> usize {
    let mut failures = 0;
    for (container, batch) in &plan.items_to_attach {
        if let Err(e) = client.attach_members(container, batch) {
            failures += 1;
            audit.error(format!(
                "attaching {} item(s) to {container} failed: [{}] {e}",
                batch.len(),
                e.failure_kind()
            ));
        }
    }
    failures
}

fn provision_phase(client: &StoreClient<'_>, plan: &ActionPlan, audit: &AuditLog) -> usize {
    let mut failures = 0;
    for container in &plan.containers_to_create {
        if let Err(e) = client.create_container(container) {
            failures += 1;
            audit.error(format!(
                "creating container {container} failed: [{}] {e}",
                e.failure_kind()
            ));
        }
    }
    for policy in &plan.policies_to_create {
        if let Err(e) = client.create_policy(policy) {
            failures += 1;
            audit.error(format!(
                "creating policy for {} failed: [{}] {e}",
                policy.container,
                e.failure_kind()
            ));
        }
    }
    failures
}
