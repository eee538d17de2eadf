use std::path::PathBuf;

use arkiv_store::StoreConnector;
use arkiv_types::error::Result;

use crate::config::ArkivConfig;
use crate::reconcile::ActionPlan;
use crate::report::AuditLog;
use crate::store::StoreClient;

/// What a run would do, without doing any of it.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan: ActionPlan,
    /// Zero-byte files held out of the plan.
    pub zero_size: Vec<PathBuf>,
    /// Source entries that did not match the grouping pattern.
    pub unmatched: usize,
}

/// Run `arkiv plan`: read sources, query the catalog, mutate nothing.
pub fn run(config: &ArkivConfig, connector: &dyn StoreConnector) -> Result<PlanReport> {
    let mut desired = super::build_desired(config)?;
    let store = connector.connect()?;
    let client = StoreClient::new(store.as_ref(), AuditLog::discard());
    let plan = super::plan_for(config, &client, &mut desired)?.plan;
    Ok(PlanReport {
        plan,
        zero_size: desired.zero_size.iter().map(|i| i.path.clone()).collect(),
        unmatched: desired.unmatched,
    })
}
