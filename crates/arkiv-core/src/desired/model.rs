use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use arkiv_types::request::{AttachRequest, PolicySpec, TransferRequest};
use arkiv_types::ScopedName;

/// One local file and where it belongs in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub path: PathBuf,
    pub id: ScopedName,
    pub container: ScopedName,
    /// Best-effort size; 0 when the file could not be stat'ed.
    pub size: u64,
    /// Observed state, written once by the reconciler.
    pub present_in_catalog: bool,
    pub present_in_container: bool,
    /// Built with the item; only `upload_ok` changes afterwards.
    pub transfer: TransferRequest,
    pub attach: AttachRequest,
}

impl Item {
    pub fn new(
        path: PathBuf,
        id: ScopedName,
        container: ScopedName,
        size: u64,
        location: &str,
        register_after_transfer: bool,
    ) -> Self {
        let transfer = TransferRequest {
            path: path.clone(),
            item: id.clone(),
            container: container.clone(),
            location: location.to_string(),
            register_after_transfer,
            upload_ok: false,
            size,
        };
        Self::from_request(transfer)
    }

    /// Rebuild an item around a request recorded by an earlier run.
    pub fn from_request(transfer: TransferRequest) -> Self {
        Self {
            path: transfer.path.clone(),
            id: transfer.item.clone(),
            container: transfer.container.clone(),
            size: transfer.size,
            present_in_catalog: false,
            present_in_container: false,
            attach: AttachRequest {
                item: transfer.item.clone(),
            },
            transfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: ScopedName,
    /// Member identities in discovery order.
    pub members: Vec<ScopedName>,
    pub present_in_catalog: bool,
}

/// Replication directive for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub container: ScopedName,
    pub location: String,
    pub replicas: u32,
    pub present_in_catalog: bool,
}

impl Policy {
    pub fn spec(&self) -> PolicySpec {
        PolicySpec {
            container: self.container.clone(),
            location: self.location.clone(),
            replicas: self.replicas,
        }
    }
}

/// Items in first-seen order with lookup by identity.
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: Vec<Item>,
    index: HashMap<ScopedName, usize>,
}

impl ItemSet {
    pub fn get(&self, id: &ScopedName) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &ScopedName) -> bool {
        self.index.contains_key(id)
    }

    /// Insert unless the identity is already present; returns whether it was added.
    pub fn insert(&mut self, item: Item) -> bool {
        if self.index.contains_key(&item.id) {
            return false;
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Item> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|i| i.size).sum()
    }
}

impl<'a> IntoIterator for &'a ItemSet {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Everything the local sources say should exist remotely.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    pub items: ItemSet,
    pub containers: BTreeMap<ScopedName, Container>,
    /// Keyed by the container identity they belong to.
    pub policies: BTreeMap<ScopedName, Policy>,
    /// Zero-byte files held out of `items`.
    pub zero_size: ItemSet,
    /// Source entries whose name did not match the grouping pattern.
    pub unmatched: usize,
}

impl DesiredState {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
