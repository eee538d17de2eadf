use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::identity::ScopedName;

/// Everything a store needs to move one local file into a storage location
/// and register it. Built once per item; only `upload_ok` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub path: PathBuf,
    pub item: ScopedName,
    pub container: ScopedName,
    /// Storage location the replica is written to.
    pub location: String,
    pub register_after_transfer: bool,
    #[serde(default)]
    pub upload_ok: bool,
    #[serde(default)]
    pub size: u64,
}

/// Membership link request: the identity of the item to attach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachRequest {
    pub item: ScopedName,
}

/// A replication policy a store should hold for one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub container: ScopedName,
    pub location: String,
    pub replicas: u32,
}

/// What a store confirms after a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub bytes: u64,
}
