use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::TransferRequest;

use super::{ensure_exists, RawEntry, SourceReader};

/// Audit-log marker preceding the JSON array of requests a run failed to
/// transfer.
pub const RECOVERY_MARKER: &str = "_RECOVERY_JSON_STRING_ : ";

/// Replays failed transfers recorded in earlier audit logs.
pub struct RecoveryLogReader {
    logs: Vec<PathBuf>,
}

impl RecoveryLogReader {
    pub fn new(logs: Vec<PathBuf>) -> Self {
        Self { logs }
    }
}

impl SourceReader for RecoveryLogReader {
    fn read(&self) -> Result<Vec<RawEntry>> {
        ensure_exists(&self.logs)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for path in &self.logs {
            let file = File::open(path)
                .map_err(|e| ArkivError::Source(format!("cannot open {}: {e}", path.display())))?;
            for (lineno, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| {
                    ArkivError::Source(format!("cannot read {}: {e}", path.display()))
                })?;
                let Some((_, json)) = line.split_once(RECOVERY_MARKER) else {
                    continue;
                };
                let requests: Vec<TransferRequest> =
                    serde_json::from_str(json.trim()).map_err(|e| {
                        ArkivError::Source(format!(
                            "{}:{}: malformed recovery record: {e}",
                            path.display(),
                            lineno + 1
                        ))
                    })?;
                for mut request in requests {
                    if seen.insert(request.item.clone()) {
                        request.upload_ok = false;
                        out.push(RawEntry::recovered(request));
                    }
                }
            }
        }
        Ok(out)
    }
}
