use std::collections::HashSet;

use arkiv_store::CatalogStore;
use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::{AttachRequest, PolicySpec, TransferReceipt, TransferRequest};
use arkiv_types::ScopedName;

use crate::report::AuditLog;

/// Thin layer over a [`CatalogStore`] handle.
///
/// Conflicts on creation count as success, a missing container has no
/// members, and every mutation leaves a line in the audit log.
pub struct StoreClient<'a> {
    store: &'a dyn CatalogStore,
    audit: AuditLog,
}

impl<'a> StoreClient<'a> {
    pub fn new(store: &'a dyn CatalogStore, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        let items = self.store.list_items(scope)?;
        tracing::debug!(scope, count = items.len(), "listed items");
        Ok(items)
    }

    pub fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        let containers = self.store.list_containers(scope)?;
        tracing::debug!(scope, count = containers.len(), "listed containers");
        Ok(containers)
    }

    /// Members of `container`; empty if the catalog does not know it.
    pub fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>> {
        match self.store.list_container_members(container) {
            Ok(members) => Ok(members),
            Err(ArkivError::NotFound(_)) => Ok(HashSet::new()),
            Err(e) => Err(e),
        }
    }

    pub fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>> {
        let policies = self.store.list_policies(location)?;
        tracing::debug!(location, count = policies.len(), "listed policies");
        Ok(policies)
    }

    pub fn create_container(&self, container: &ScopedName) -> Result<()> {
        match self.store.create_container(container) {
            Ok(()) => {
                self.audit.info(format!("added container {container}"));
                Ok(())
            }
            Err(ArkivError::AlreadyExists(_)) => {
                self.audit.info(format!("container {container} already exists"));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn create_policy(&self, policy: &PolicySpec) -> Result<()> {
        let label = format!(
            "{} -> {} x{}",
            policy.container, policy.location, policy.replicas
        );
        match self.store.create_policy(policy) {
            Ok(()) => {
                self.audit.info(format!("added policy {label}"));
                Ok(())
            }
            Err(ArkivError::DuplicatePolicy(_)) => {
                self.audit.info(format!("policy {label} already exists"));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        match self.store.attach_members(container, items) {
            Ok(()) => {
                self.audit.info(format!(
                    "attached {} item(s) to {container}",
                    items.len()
                ));
                Ok(())
            }
            // A retried attach can land after the first one was applied.
            Err(ArkivError::AlreadyExists(_)) => {
                self.audit.info(format!(
                    "{} item(s) already attached to {container}",
                    items.len()
                ));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        self.store.transfer_item(request)
    }

    pub fn clear_partial_transfer(&self, request: &TransferRequest) -> Result<()> {
        self.store.clear_partial_transfer(request)
    }
}
