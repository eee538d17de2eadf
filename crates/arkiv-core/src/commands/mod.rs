pub mod plan;
pub mod run;

use arkiv_types::error::Result;

use crate::config::ArkivConfig;
use crate::desired::{DesiredState, DesiredStateBuilder};
use crate::reconcile::{reconcile, Reconciliation};
use crate::sources;
use crate::store::StoreClient;

/// Read every source and build the desired state. Runs before any store
/// call, so a failure here leaves the catalog untouched.
pub(crate) fn build_desired(config: &ArkivConfig) -> Result<DesiredState> {
    let entries = sources::read_all(&config.sources, &config.grouping_pattern)?;
    tracing::debug!(entries = entries.len(), "source entries read");
    DesiredStateBuilder::new(config).build(entries)
}

/// Query the catalog and derive the action lists.
pub(crate) fn plan_for(
    config: &ArkivConfig,
    client: &StoreClient<'_>,
    desired: &mut DesiredState,
) -> Result<Reconciliation> {
    reconcile(
        client,
        desired,
        &config.scope,
        &config.destination_location,
    )
}
