use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::identity::container_name;
use arkiv_types::ScopedName;

use crate::checksum::file_digest;
use crate::config::{ArkivConfig, ZeroSizePolicy};
use crate::locator::LocatorTranslator;
use crate::sources::RawEntry;

use super::model::{Container, DesiredState, Item, Policy};

/// Turns raw source entries into the desired item, container and policy sets.
pub struct DesiredStateBuilder<'a> {
    config: &'a ArkivConfig,
    translator: LocatorTranslator,
}

impl<'a> DesiredStateBuilder<'a> {
    pub fn new(config: &'a ArkivConfig) -> Self {
        Self {
            config,
            translator: LocatorTranslator::new(config.locator.clone()),
        }
    }

    /// Capture group 1 of the grouping pattern applied to `source`.
    pub fn grouping_key<'s>(&self, source: &'s str) -> Option<&'s str> {
        self.config
            .grouping_pattern
            .captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// Build the desired state.
    ///
    /// Fails with `NamingCollision` when two different paths with different
    /// content map to one identity; nothing partial is returned.
    pub fn build(&self, entries: Vec<RawEntry>) -> Result<DesiredState> {
        let mut state = DesiredState::default();
        let mut first_path: HashMap<ScopedName, PathBuf> = HashMap::new();

        for entry in entries {
            let Some(item) = self.item_for(entry, &mut state)? else {
                continue;
            };

            if let Some(existing) = first_path.get(&item.id) {
                check_duplicate(&item.id, existing, &item.path)?;
                continue;
            }
            first_path.insert(item.id.clone(), item.path.clone());

            if item.size == 0 && self.config.zero_size == ZeroSizePolicy::Skip {
                tracing::info!(item = %item.id, path = %item.path.display(), "zero-size file held back");
                state.zero_size.insert(item);
                continue;
            }

            state
                .containers
                .entry(item.container.clone())
                .or_insert_with(|| Container {
                    id: item.container.clone(),
                    members: Vec::new(),
                    present_in_catalog: false,
                })
                .members
                .push(item.id.clone());
            state.items.insert(item);
        }

        for id in state.containers.keys() {
            state.policies.insert(
                id.clone(),
                Policy {
                    container: id.clone(),
                    location: self.config.destination_location.clone(),
                    replicas: self.config.replicas,
                    present_in_catalog: false,
                },
            );
        }

        if state.items.is_empty() && state.unmatched > 0 {
            tracing::warn!(
                unmatched = state.unmatched,
                "no source entry matched the grouping pattern"
            );
        }
        tracing::info!(
            items = state.items.len(),
            containers = state.containers.len(),
            zero_size = state.zero_size.len(),
            unmatched = state.unmatched,
            "desired state built"
        );
        Ok(state)
    }

    fn item_for(&self, entry: RawEntry, state: &mut DesiredState) -> Result<Option<Item>> {
        if let Some(mut request) = entry.recovered {
            request.size = file_size(&request.path);
            return Ok(Some(Item::from_request(request)));
        }

        let path = self
            .translator
            .local_path_from_remote_locator(&entry.locator)?;
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            tracing::warn!(locator = %entry.locator, "locator has no file name, skipped");
            state.unmatched += 1;
            return Ok(None);
        };
        let Some(key) = self.grouping_key(&entry.group_source) else {
            tracing::debug!(source = %entry.group_source, "no grouping key, skipped");
            state.unmatched += 1;
            return Ok(None);
        };

        let scope = &self.config.scope;
        let container = ScopedName::new(
            scope.as_str(),
            container_name(key, &self.config.container_template),
        );
        let id = ScopedName::new(scope.as_str(), name);
        let size = file_size(&path);
        Ok(Some(Item::new(
            path,
            id,
            container,
            size,
            &self.config.upload_location,
            self.config.register_after_transfer,
        )))
    }
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// A second path for an identity is only acceptable if it is the same
/// file or a byte-identical copy.
fn check_duplicate(id: &ScopedName, first: &Path, second: &Path) -> Result<()> {
    if first == second {
        return Ok(());
    }
    if file_digest(first)? == file_digest(second)? {
        tracing::info!(
            item = %id,
            kept = %first.display(),
            dropped = %second.display(),
            "identical duplicate ignored"
        );
        return Ok(());
    }
    Err(ArkivError::NamingCollision {
        identity: id.clone(),
        first: first.to_path_buf(),
        second: second.to_path_buf(),
    })
}
