use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use arkiv_store::{CatalogStore, StoreConnector};
use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::{AttachRequest, PolicySpec, TransferReceipt, TransferRequest};
use arkiv_types::ScopedName;

/// One recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListItems(String),
    ListContainers(String),
    ListMembers(ScopedName),
    ListPolicies(String),
    CreateContainer(ScopedName),
    CreatePolicy(ScopedName),
    Attach(ScopedName, Vec<ScopedName>),
    Transfer(ScopedName),
    ClearPartial(ScopedName),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateContainer(_) | Call::CreatePolicy(_) | Call::Attach(..) | Call::Transfer(_)
        )
    }
}

#[derive(Default)]
struct CatalogState {
    items: HashSet<ScopedName>,
    containers: HashSet<ScopedName>,
    /// Membership is tracked apart from `containers` so tests can describe
    /// a catalog whose container listing lags behind its membership.
    members: HashMap<ScopedName, HashSet<ScopedName>>,
    policies: HashSet<(ScopedName, String)>,
}

/// In-memory catalog for testing. Thread-safe via Mutex.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    calls: Mutex<Vec<Call>>,
    transfer_threads: Mutex<Vec<(ScopedName, ThreadId)>>,
    transfer_failures: Mutex<HashMap<String, fn(String) -> ArkivError>>,
    query_failure: Mutex<Option<fn(String) -> ArkivError>>,
    attach_failure: Mutex<Option<fn(String) -> ArkivError>>,
    connects: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_item(&self, id: &ScopedName) {
        self.state.lock().unwrap().items.insert(id.clone());
    }

    pub fn add_container(&self, id: &ScopedName) {
        let mut state = self.state.lock().unwrap();
        state.containers.insert(id.clone());
        state.members.entry(id.clone()).or_default();
    }

    /// Record membership without listing the container itself.
    pub fn add_member(&self, container: &ScopedName, item: &ScopedName) {
        let mut state = self.state.lock().unwrap();
        state
            .members
            .entry(container.clone())
            .or_default()
            .insert(item.clone());
    }

    pub fn add_policy(&self, container: &ScopedName, location: &str) {
        self.state
            .lock()
            .unwrap()
            .policies
            .insert((container.clone(), location.to_string()));
    }

    /// Make every transfer of the item called `name` fail with `error`.
    pub fn fail_transfer_of(&self, name: &str, error: fn(String) -> ArkivError) {
        self.transfer_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn fail_queries(&self, error: fn(String) -> ArkivError) {
        *self.query_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_attach(&self, error: fn(String) -> ArkivError) {
        *self.attach_failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Items in the order their transfer was attempted, with the thread that
    /// attempted it.
    pub fn transfer_threads(&self) -> Vec<(ScopedName, ThreadId)> {
        self.transfer_threads.lock().unwrap().clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn has_item(&self, id: &ScopedName) -> bool {
        self.state.lock().unwrap().items.contains(id)
    }

    pub fn has_container(&self, id: &ScopedName) -> bool {
        self.state.lock().unwrap().containers.contains(id)
    }

    pub fn members_of(&self, id: &ScopedName) -> HashSet<ScopedName> {
        self.state
            .lock()
            .unwrap()
            .members
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn policy_count(&self) -> usize {
        self.state.lock().unwrap().policies.len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_query(&self, what: &str) -> Result<()> {
        match *self.query_failure.lock().unwrap() {
            Some(error) => Err(error(what.to_string())),
            None => Ok(()),
        }
    }
}

impl CatalogStore for MemoryCatalog {
    fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.record(Call::ListItems(scope.to_string()));
        self.check_query("list items")?;
        let state = self.state.lock().unwrap();
        Ok(state.items.iter().filter(|i| i.scope == scope).cloned().collect())
    }

    fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.record(Call::ListContainers(scope.to_string()));
        self.check_query("list containers")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .filter(|c| c.scope == scope)
            .cloned()
            .collect())
    }

    fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>> {
        self.record(Call::ListMembers(container.clone()));
        self.check_query("list members")?;
        let state = self.state.lock().unwrap();
        state
            .members
            .get(container)
            .cloned()
            .ok_or_else(|| ArkivError::NotFound(container.to_string()))
    }

    fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>> {
        self.record(Call::ListPolicies(location.to_string()));
        self.check_query("list policies")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .policies
            .iter()
            .filter(|(_, l)| l == location)
            .map(|(c, _)| c.clone())
            .collect())
    }

    fn create_container(&self, container: &ScopedName) -> Result<()> {
        self.record(Call::CreateContainer(container.clone()));
        let mut state = self.state.lock().unwrap();
        if !state.containers.insert(container.clone()) {
            return Err(ArkivError::AlreadyExists(container.to_string()));
        }
        state.members.entry(container.clone()).or_default();
        Ok(())
    }

    fn create_policy(&self, policy: &PolicySpec) -> Result<()> {
        self.record(Call::CreatePolicy(policy.container.clone()));
        let mut state = self.state.lock().unwrap();
        if !state
            .policies
            .insert((policy.container.clone(), policy.location.clone()))
        {
            return Err(ArkivError::DuplicatePolicy(policy.container.to_string()));
        }
        Ok(())
    }

    fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()> {
        self.record(Call::Attach(
            container.clone(),
            items.iter().map(|a| a.item.clone()).collect(),
        ));
        if let Some(error) = *self.attach_failure.lock().unwrap() {
            return Err(error(container.to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let members = state.members.entry(container.clone()).or_default();
        members.extend(items.iter().map(|a| a.item.clone()));
        Ok(())
    }

    fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        self.record(Call::Transfer(request.item.clone()));
        self.transfer_threads
            .lock()
            .unwrap()
            .push((request.item.clone(), std::thread::current().id()));
        if let Some(error) = self.transfer_failures.lock().unwrap().get(&request.item.name) {
            return Err(error(request.item.to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.items.insert(request.item.clone());
        state
            .members
            .entry(request.container.clone())
            .or_default()
            .insert(request.item.clone());
        Ok(TransferReceipt {
            bytes: request.size,
        })
    }

    fn clear_partial_transfer(&self, request: &TransferRequest) -> Result<()> {
        self.record(Call::ClearPartial(request.item.clone()));
        Ok(())
    }
}

/// Hands out handles that all share one [`MemoryCatalog`].
#[derive(Clone)]
pub struct MemoryConnector(pub Arc<MemoryCatalog>);

struct SharedCatalog(Arc<MemoryCatalog>);

impl CatalogStore for SharedCatalog {
    fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.0.list_items(scope)
    }
    fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>> {
        self.0.list_containers(scope)
    }
    fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>> {
        self.0.list_container_members(container)
    }
    fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>> {
        self.0.list_policies(location)
    }
    fn create_container(&self, container: &ScopedName) -> Result<()> {
        self.0.create_container(container)
    }
    fn create_policy(&self, policy: &PolicySpec) -> Result<()> {
        self.0.create_policy(policy)
    }
    fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()> {
        self.0.attach_members(container, items)
    }
    fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt> {
        self.0.transfer_item(request)
    }
    fn clear_partial_transfer(&self, request: &TransferRequest) -> Result<()> {
        self.0.clear_partial_transfer(request)
    }
}

impl StoreConnector for MemoryConnector {
    fn connect(&self) -> Result<Box<dyn CatalogStore>> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SharedCatalog(Arc::clone(&self.0))))
    }
}
