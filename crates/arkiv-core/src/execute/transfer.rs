use std::thread;
use std::time::{Duration, Instant};

use arkiv_store::{CatalogStore, StoreConnector};
use arkiv_types::request::TransferRequest;

use crate::config::TransferConfig;
use crate::report::AuditLog;
use crate::store::StoreClient;

/// Result of one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// The request as attempted, `upload_ok` set on success.
    pub request: TransferRequest,
    pub worker: usize,
    /// Byte count the store confirmed.
    pub confirmed_bytes: Option<u64>,
    /// Failure kind when the attempt did not succeed.
    pub failure: Option<String>,
}

/// Split `items` into exactly `workers` batches; batch `i` gets the items
/// at positions `i`, `i + workers`, `i + 2 * workers`, ...
pub fn partition_round_robin<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let mut batches: Vec<Vec<T>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        batches[i % workers].push(item);
    }
    batches
}

/// Transfer every request with `config.workers` concurrent workers.
///
/// Each worker owns one batch, opens its own store handle and processes the
/// batch in order. A failed item is recorded and left for the next run.
/// Returns once every worker has finished.
pub fn run_transfers(
    connector: &dyn StoreConnector,
    requests: Vec<TransferRequest>,
    config: &TransferConfig,
    audit: &AuditLog,
) -> Vec<TransferOutcome> {
    if requests.is_empty() {
        return Vec::new();
    }
    let batches = partition_round_robin(requests, config.workers);
    let floor = config.min_attempt;

    thread::scope(|s| {
        let mut handles = Vec::new();
        for (worker, batch) in batches.into_iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            let audit = audit.clone();
            let pending = batch.clone();
            let handle = s.spawn(move || run_batch(worker, batch, connector, floor, &audit));
            handles.push((worker, pending, handle));
        }

        let mut outcomes = Vec::new();
        for (worker, pending, handle) in handles {
            match handle.join() {
                Ok(batch_outcomes) => outcomes.extend(batch_outcomes),
                Err(_) => {
                    audit.error(format!(
                        "transfer worker {worker} panicked; {} item(s) marked failed",
                        pending.len()
                    ));
                    outcomes.extend(pending.into_iter().map(|request| TransferOutcome {
                        request,
                        worker,
                        confirmed_bytes: None,
                        failure: Some("worker-panicked".into()),
                    }));
                }
            }
        }
        outcomes
    })
}

fn run_batch(
    worker: usize,
    batch: Vec<TransferRequest>,
    connector: &dyn StoreConnector,
    floor: Duration,
    audit: &AuditLog,
) -> Vec<TransferOutcome> {
    tracing::debug!(worker, items = batch.len(), "transfer worker started");
    let mut handle: Option<Box<dyn CatalogStore>> = None;
    let mut outcomes = Vec::with_capacity(batch.len());

    for mut request in batch {
        let started = Instant::now();

        let store = match handle.take() {
            Some(store) => Ok(store),
            None => connector.connect(),
        };
        let outcome = match store {
            Ok(store) => {
                let outcome = attempt(worker, &mut request, store.as_ref(), audit);
                // A fresh handle after any failure.
                if outcome.failure.is_none() {
                    handle = Some(store);
                }
                outcome
            }
            Err(e) => {
                audit.error(format!(
                    "worker {worker}: cannot connect for {}: [{}] {e}",
                    request.item,
                    e.failure_kind()
                ));
                TransferOutcome {
                    request,
                    worker,
                    confirmed_bytes: None,
                    failure: Some(e.failure_kind().to_string()),
                }
            }
        };
        outcomes.push(outcome);

        let elapsed = started.elapsed();
        if elapsed < floor {
            thread::sleep(floor - elapsed);
        }
    }
    tracing::debug!(worker, "transfer worker finished");
    outcomes
}

fn attempt(
    worker: usize,
    request: &mut TransferRequest,
    store: &dyn CatalogStore,
    audit: &AuditLog,
) -> TransferOutcome {
    let client = StoreClient::new(store, audit.clone());
    if let Err(e) = client.clear_partial_transfer(request) {
        tracing::warn!(item = %request.item, error = %e, "could not clear partial transfer");
    }

    audit.info(format!(
        "worker {worker}: uploading {} ({} bytes) from {}",
        request.item,
        request.size,
        request.path.display()
    ));
    match client.transfer_item(request) {
        Ok(receipt) => {
            request.upload_ok = true;
            if receipt.bytes != request.size {
                audit.warn(format!(
                    "worker {worker}: {} confirmed {} bytes, expected {}",
                    request.item, receipt.bytes, request.size
                ));
            }
            audit.info(format!("worker {worker}: uploaded {}", request.item));
            TransferOutcome {
                request: request.clone(),
                worker,
                confirmed_bytes: Some(receipt.bytes),
                failure: None,
            }
        }
        Err(e) => {
            request.upload_ok = false;
            let kind = e.failure_kind();
            let line = format!("worker {worker}: upload of {} failed: [{kind}] {e}", request.item);
            if e.is_recoverable_transfer_failure() {
                audit.warn(line);
            } else {
                audit.error(line);
            }
            TransferOutcome {
                request: request.clone(),
                worker,
                confirmed_bytes: None,
                failure: Some(kind.to_string()),
            }
        }
    }
}
