mod audit;

pub use self::audit::{AuditLevel, AuditLog};

use arkiv_types::request::TransferRequest;
use arkiv_types::ScopedName;

use crate::desired::DesiredState;
use crate::execute::TransferOutcome;
use crate::reconcile::{ActionPlan, ObservedState};
use crate::sources::RECOVERY_MARKER;

/// Result of the execution phases of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ok_count: usize,
    pub fail_count: usize,
    /// Sum of item sizes for confirmed transfers.
    pub ok_bytes: u64,
    /// Sum of item sizes for every attempted transfer.
    pub total_bytes: u64,
    /// Sum of the byte counts the store confirmed.
    pub confirmed_bytes: u64,
    pub attach_failures: usize,
    pub provision_failures: usize,
    /// Requests that did not transfer, with `upload_ok == false`.
    pub failed: Vec<TransferRequest>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[TransferOutcome]) -> Self {
        let mut summary = RunSummary::default();
        for outcome in outcomes {
            let size = outcome.request.size;
            summary.total_bytes += size;
            if outcome.request.upload_ok {
                summary.ok_count += 1;
                summary.ok_bytes += size;
                summary.confirmed_bytes += outcome.confirmed_bytes.unwrap_or(0);
            } else {
                summary.fail_count += 1;
                summary.failed.push(outcome.request.clone());
            }
        }
        summary
    }

    pub fn attempted(&self) -> usize {
        self.ok_count + self.fail_count
    }

    pub fn files_line(&self) -> String {
        format!("uploaded files: {} of {}", self.ok_count, self.attempted())
    }

    pub fn bytes_line(&self) -> String {
        format!("uploaded bytes: {} of {}", self.ok_bytes, self.total_bytes)
    }

    pub fn is_clean(&self) -> bool {
        self.fail_count == 0 && self.attach_failures == 0 && self.provision_failures == 0
    }
}

/// Write the desired entities with their observed flags, then the catalog
/// sets they were checked against.
pub fn log_observed(audit: &AuditLog, desired: &DesiredState, observed: &ObservedState) {
    audit.table(
        AuditLevel::Debug,
        "input items",
        desired.items.iter().map(|i| {
            format!(
                "{}  {}  {}  size={}  present_in_catalog={}  present_in_container={}",
                i.id,
                i.container,
                i.path.display(),
                i.size,
                i.present_in_catalog,
                i.present_in_container
            )
        }),
    );
    audit.table(
        AuditLevel::Debug,
        "input containers",
        desired.containers.values().map(|c| {
            format!(
                "{}  members={}  present_in_catalog={}",
                c.id,
                c.members.len(),
                c.present_in_catalog
            )
        }),
    );
    audit.table(
        AuditLevel::Debug,
        "input policies",
        desired.policies.values().map(|p| {
            format!(
                "{}  {}  replicas={}  present_in_catalog={}",
                p.container, p.location, p.replicas, p.present_in_catalog
            )
        }),
    );

    audit.table(AuditLevel::Debug, "items in catalog", sorted(&observed.items));
    audit.table(
        AuditLevel::Debug,
        "containers in catalog",
        sorted(&observed.containers),
    );
    let mut containers: Vec<_> = observed.members.keys().collect();
    containers.sort();
    audit.table(
        AuditLevel::Debug,
        "items in containers",
        containers.into_iter().flat_map(|c| {
            sorted(&observed.members[c])
                .into_iter()
                .map(move |item| format!("{c}  {item}"))
        }),
    );
    audit.table(
        AuditLevel::Debug,
        "policies in catalog",
        sorted(&observed.policies),
    );
}

fn sorted<'a>(ids: impl IntoIterator<Item = &'a ScopedName>) -> Vec<String> {
    let mut ids: Vec<_> = ids.into_iter().collect();
    ids.sort();
    ids.into_iter().map(ScopedName::to_string).collect()
}

/// Write the action tables of a plan.
pub fn log_plan(audit: &AuditLog, desired: &DesiredState, plan: &ActionPlan) {
    audit.table(
        AuditLevel::Info,
        "files to upload",
        plan.items_to_transfer.iter().map(|r| {
            format!(
                "{}  {}  size={}  location={}  register={}",
                r.item,
                r.path.display(),
                r.size,
                r.location,
                r.register_after_transfer
            )
        }),
    );
    audit.table(
        AuditLevel::Info,
        "containers to add",
        plan.containers_to_create.iter().map(|c| c.to_string()),
    );
    audit.table(
        AuditLevel::Info,
        "policies to add",
        plan.policies_to_create
            .iter()
            .map(|p| format!("{}  {}  replicas={}", p.container, p.location, p.replicas)),
    );
    audit.table(
        AuditLevel::Info,
        "files to attach",
        plan.items_to_attach
            .iter()
            .flat_map(|(c, batch)| batch.iter().map(move |a| format!("{}  ->  {c}", a.item))),
    );
    if !desired.zero_size.is_empty() {
        audit.table(
            AuditLevel::Warn,
            "zero-size files held back",
            desired
                .zero_size
                .iter()
                .map(|i| format!("{}  {}", i.id, i.path.display())),
        );
    }
}

/// Write the closing summary and, when something failed, a recovery record
/// that a `recovery_log` source can replay.
pub fn log_summary(audit: &AuditLog, summary: &RunSummary) {
    audit.section(AuditLevel::Info, "summary");
    audit.info(summary.files_line());
    audit.info(summary.bytes_line());
    if summary.confirmed_bytes != summary.ok_bytes {
        audit.warn(format!(
            "store confirmed {} bytes for {} expected",
            summary.confirmed_bytes, summary.ok_bytes
        ));
    }
    if summary.attach_failures > 0 {
        audit.warn(format!("attach failures: {}", summary.attach_failures));
    }
    if summary.provision_failures > 0 {
        audit.warn(format!("provision failures: {}", summary.provision_failures));
    }
    audit.end_section(AuditLevel::Info);

    if !summary.failed.is_empty() {
        match serde_json::to_string(&summary.failed) {
            Ok(json) => audit.info(format!("{RECOVERY_MARKER}{json}")),
            Err(e) => audit.error(format!("cannot encode recovery record: {e}")),
        }
    }
}
