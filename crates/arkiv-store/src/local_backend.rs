use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::{AttachRequest, PolicySpec, TransferReceipt, TransferRequest};
use arkiv_types::ScopedName;

use crate::paths::{partial_path, replica_relative_path};
use crate::CatalogStore;

const CATALOG_DIR: &str = "catalog";
const CATALOG_FILE: &str = "catalog.json";
const LOCATIONS_DIR: &str = "locations";

// Every handle in this process serializes catalog read-modify-write cycles
// through one lock, since transfer workers each open their own handle.
static CATALOG_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    /// scope -> registered item names
    #[serde(default)]
    items: BTreeMap<String, BTreeSet<String>>,
    /// scope -> container name -> member identities (`scope:name`)
    #[serde(default)]
    containers: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    #[serde(default)]
    policies: Vec<PolicyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PolicyRecord {
    container: String,
    location: String,
    replicas: u32,
}

/// Catalog store backed by a directory: a JSON catalog plus one replica tree
/// per storage location.
pub struct LocalCatalog {
    root: PathBuf,
}

impl LocalCatalog {
    /// Open (creating if needed) a catalog rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root.join(CATALOG_DIR))?;
        fs::create_dir_all(root.join(LOCATIONS_DIR))?;
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the replica of `item` at `location` lives.
    pub fn replica_path(&self, location: &str, item: &ScopedName) -> Result<PathBuf> {
        validate_segment(location, "location")?;
        validate_segment(&item.name, "name")?;
        Ok(self
            .root
            .join(LOCATIONS_DIR)
            .join(location)
            .join(replica_relative_path(item)))
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_DIR).join(CATALOG_FILE)
    }

    fn load(&self) -> Result<CatalogFile> {
        match fs::read(self.catalog_path()) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CatalogFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, catalog: &CatalogFile) -> Result<()> {
        let data = serde_json::to_vec_pretty(catalog)?;
        let path = self.catalog_path();
        let dir = path.parent().unwrap_or(&self.root);
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogFile) -> Result<T>) -> Result<T> {
        let _guard = CATALOG_LOCK
            .lock()
            .map_err(|_| ArkivError::Other("catalog lock poisoned".into()))?;
        f(&self.load()?)
    }

    fn update<T>(&self, f: impl FnOnce(&mut CatalogFile) -> Result<T>) -> Result<T> {
        let _guard = CATALOG_LOCK
            .lock()
            .map_err(|_| ArkivError::Other("catalog lock poisoned".into()))?;
        let mut catalog = self.load()?;
        let out = f(&mut catalog)?;
        self.save(&catalog)?;
        Ok(out)
    }
}

fn validate_segment(value: &str, what: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(ArkivError::Store(format!("unsafe {what} '{value}'")));
    }
    Ok(())
}

fn members_of<'a>(
    catalog: &'a mut CatalogFile,
    container: &ScopedName,
) -> Result<&'a mut BTreeSet<String>> {
    catalog
        .containers
        .get_mut(&container.scope)
        .and_then(|by_name| by_name.get_mut(&container.name))
        .ok_or_else(|| ArkivError::NotFound(container.to_wire()))
}

fn is_registered(catalog: &CatalogFile, id: &ScopedName) -> bool {
    catalog
        .items
        .get(&id.scope)
        .is_some_and(|names| names.contains(&id.name))
}

impl CatalogStore for LocalCatalog {
    fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.read(|c| {
            Ok(c.items
                .get(scope)
                .map(|names| names.iter().map(|n| ScopedName::new(scope, n)).collect())
                .unwrap_or_default())
        })
    }

    fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.read(|c| {
            Ok(c.containers
                .get(scope)
                .map(|by_name| by_name.keys().map(|n| ScopedName::new(scope, n)).collect())
                .unwrap_or_default())
        })
    }

    fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>> {
        self.read(|c| {
            let members = c
                .containers
                .get(&container.scope)
                .and_then(|by_name| by_name.get(&container.name))
                .ok_or_else(|| ArkivError::NotFound(container.to_wire()))?;
            members.iter().map(|w| ScopedName::parse(w)).collect()
        })
    }

    fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>> {
        self.read(|c| {
            c.policies
                .iter()
                .filter(|p| p.location == location)
                .map(|p| ScopedName::parse(&p.container))
                .collect()
        })
    }

    fn create_container(&self, container: &ScopedName) -> Result<()> {
        self.update(|c| {
            let by_name = c.containers.entry(container.scope.clone()).or_default();
            if by_name.contains_key(&container.name) {
                return Err(ArkivError::AlreadyExists(container.to_wire()));
            }
            by_name.insert(container.name.clone(), BTreeSet::new());
            Ok(())
        })
    }

    fn create_policy(&self, policy: &PolicySpec) -> Result<()> {
        let record = PolicyRecord {
            container: policy.container.to_wire(),
            location: policy.location.clone(),
            replicas: policy.replicas,
        };
        self.update(|c| {
            if c
                .policies
                .iter()
                .any(|p| p.container == record.container && p.location == record.location)
            {
                return Err(ArkivError::DuplicatePolicy(format!(
                    "{} -> {}",
                    record.container, record.location
                )));
            }
            c.policies.push(record);
            Ok(())
        })
    }

    fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()> {
        self.update(|c| {
            if let Some(missing) = items.iter().find(|a| !is_registered(c, &a.item)) {
                return Err(ArkivError::NotFound(missing.item.to_wire()));
            }
            let members = members_of(c, container)?;
            for a in items {
                members.insert(a.item.to_wire());
            }
            Ok(())
        })
    }

    /// The item is always registered and attached to its container; the
    /// flag only decides whether that happens after the copy or before it.
    fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        let register = || {
            self.update(|c| {
                c.items
                    .entry(request.item.scope.clone())
                    .or_default()
                    .insert(request.item.name.clone());
                members_of(c, &request.container)?.insert(request.item.to_wire());
                Ok(())
            })
        };
        if !request.register_after_transfer {
            register()?;
        }

        let dest = self.replica_path(&request.location, &request.item)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = partial_path(&dest);

        let mut src = File::open(&request.path)?;
        let mut out = File::create(&staging)?;
        let bytes = io::copy(&mut src, &mut out)?;
        out.sync_all()?;
        drop(out);
        fs::rename(&staging, &dest)?;

        if request.register_after_transfer {
            register()?;
        }
        Ok(TransferReceipt { bytes })
    }

    fn clear_partial_transfer(&self, request: &TransferRequest) -> Result<()> {
        let staging = partial_path(&self.replica_path(&request.location, &request.item)?);
        match fs::remove_file(&staging) {
            Ok(()) => {
                tracing::debug!("removed partial replica {}", staging.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
