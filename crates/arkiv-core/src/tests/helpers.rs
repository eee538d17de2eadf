use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tempfile::TempDir;

use arkiv_store::{RetryConfig, StoreConfig};
use arkiv_types::ScopedName;

use crate::config::{ArkivConfig, SourceEntry, SourceKind, TransferConfig, ZeroSizePolicy};
use crate::report::AuditLog;
use crate::store::StoreClient;

pub const SCOPE: &str = "user.test";
pub const UPLOAD: &str = "UPLOAD_DISK";
pub const DEST: &str = "TAPE";

pub fn make_test_config(source_dir: &Path) -> ArkivConfig {
    ArkivConfig {
        store: StoreConfig {
            url: "memory".into(),
            token: None,
            allow_insecure_http: false,
            retry: RetryConfig::default(),
        },
        scope: SCOPE.into(),
        upload_location: UPLOAD.into(),
        destination_location: DEST.into(),
        replicas: 1,
        container_template: "run-{}-raw".into(),
        grouping_pattern: Regex::new(r"^(?:run_(\d+)_)").unwrap(),
        register_after_transfer: true,
        zero_size: ZeroSizePolicy::Skip,
        locator: None,
        transfer: TransferConfig {
            workers: 3,
            min_attempt: Duration::ZERO,
        },
        audit_log_dir: std::env::temp_dir(),
        sources: vec![SourceEntry {
            kind: SourceKind::Directory,
            paths: vec![source_dir.to_path_buf()],
        }],
    }
}

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// A source directory holding `files` plus a config reading it.
pub fn fixture(files: &[(&str, &str)]) -> (TempDir, ArkivConfig) {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        write_file(dir.path(), name, contents);
    }
    let config = make_test_config(dir.path());
    (dir, config)
}

/// Three non-empty files of run 0042.
pub fn run_0042_fixture() -> (TempDir, ArkivConfig) {
    fixture(&[
        ("run_0042_a.dat", "alpha"),
        ("run_0042_b.dat", "bravo!"),
        ("run_0042_c.dat", "charlie"),
    ])
}

pub fn item_id(name: &str) -> ScopedName {
    ScopedName::new(SCOPE, name)
}

pub fn container_id(key: &str) -> ScopedName {
    ScopedName::new(SCOPE, format!("run-{key}-raw"))
}

pub fn client(store: &dyn arkiv_store::CatalogStore) -> StoreClient<'_> {
    StoreClient::new(store, AuditLog::in_memory())
}
