use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use arkiv_types::error::Result;
use arkiv_types::request::{AttachRequest, PolicySpec, TransferRequest};
use arkiv_types::ScopedName;

use crate::desired::DesiredState;
use crate::store::StoreClient;

/// What the catalog reported at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct ObservedState {
    pub items: HashSet<ScopedName>,
    pub containers: HashSet<ScopedName>,
    /// Containers holding a policy for the destination location.
    pub policies: HashSet<ScopedName>,
    pub members: HashMap<ScopedName, HashSet<ScopedName>>,
}

impl ObservedState {
    /// Query the catalog: one round trip per kind and scope, plus one per
    /// desired container for its members. Any failure aborts the run.
    pub fn fetch(
        client: &StoreClient<'_>,
        desired: &DesiredState,
        scope: &str,
        location: &str,
    ) -> Result<Self> {
        // Recovered requests may carry a scope other than the configured one.
        let mut scopes = BTreeSet::from([scope.to_string()]);
        scopes.extend(desired.items.iter().map(|i| i.id.scope.clone()));
        scopes.extend(desired.containers.keys().map(|c| c.scope.clone()));

        let mut observed = ObservedState::default();
        for scope in &scopes {
            observed.items.extend(client.list_items(scope)?);
        }
        observed.policies = client.list_policies(location)?;
        for scope in &scopes {
            observed.containers.extend(client.list_containers(scope)?);
        }
        for id in desired.containers.keys() {
            let members = client.list_container_members(id)?;
            observed.members.insert(id.clone(), members);
        }
        tracing::info!(
            items = observed.items.len(),
            containers = observed.containers.len(),
            policies = observed.policies.len(),
            "catalog state fetched"
        );
        Ok(observed)
    }

    fn is_member(&self, container: &ScopedName, item: &ScopedName) -> bool {
        self.members
            .get(container)
            .is_some_and(|m| m.contains(item))
    }
}

/// The four action lists that move the catalog towards the desired state.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    pub containers_to_create: Vec<ScopedName>,
    pub policies_to_create: Vec<PolicySpec>,
    /// In item discovery order; the transfer partition depends on it.
    pub items_to_transfer: Vec<TransferRequest>,
    pub items_to_attach: BTreeMap<ScopedName, Vec<AttachRequest>>,
}

impl ActionPlan {
    pub fn is_empty(&self) -> bool {
        self.containers_to_create.is_empty()
            && self.policies_to_create.is_empty()
            && self.items_to_transfer.is_empty()
            && self.items_to_attach.is_empty()
    }

    pub fn attach_count(&self) -> usize {
        self.items_to_attach.values().map(Vec::len).sum()
    }

    pub fn transfer_bytes(&self) -> u64 {
        self.items_to_transfer.iter().map(|r| r.size).sum()
    }
}

/// Set every observed flag in `desired` from `observed`.
pub fn apply_observed(desired: &mut DesiredState, observed: &ObservedState) {
    for item in desired.items.iter_mut() {
        item.present_in_catalog = observed.items.contains(&item.id);
        item.present_in_container = observed.is_member(&item.container, &item.id);
    }
    for container in desired.containers.values_mut() {
        container.present_in_catalog = observed.containers.contains(&container.id);
    }
    for policy in desired.policies.values_mut() {
        policy.present_in_catalog = observed.policies.contains(&policy.container);
    }
}

/// Derive the action lists from flags set by [`apply_observed`].
pub fn plan_actions(desired: &DesiredState) -> ActionPlan {
    let mut plan = ActionPlan::default();
    for container in desired.containers.values() {
        if !container.present_in_catalog {
            plan.containers_to_create.push(container.id.clone());
        }
    }
    for policy in desired.policies.values() {
        if !policy.present_in_catalog {
            plan.policies_to_create.push(policy.spec());
        }
    }
    for item in &desired.items {
        if !item.present_in_catalog {
            plan.items_to_transfer.push(item.transfer.clone());
        } else if !item.present_in_container {
            plan.items_to_attach
                .entry(item.container.clone())
                .or_default()
                .push(item.attach.clone());
        }
    }
    plan
}

/// Catalog snapshot and the action lists derived from it.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub observed: ObservedState,
    pub plan: ActionPlan,
}

/// Query the catalog, flag `desired`, and return what has to change.
pub fn reconcile(
    client: &StoreClient<'_>,
    desired: &mut DesiredState,
    scope: &str,
    location: &str,
) -> Result<Reconciliation> {
    let observed = ObservedState::fetch(client, desired, scope, location)?;
    apply_observed(desired, &observed);
    let plan = plan_actions(desired);
    tracing::info!(
        containers = plan.containers_to_create.len(),
        policies = plan.policies_to_create.len(),
        transfers = plan.items_to_transfer.len(),
        attaches = plan.attach_count(),
        "reconciliation complete"
    );
    Ok(Reconciliation { observed, plan })
}
