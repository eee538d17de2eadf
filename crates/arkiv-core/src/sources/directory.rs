use std::path::PathBuf;

use walkdir::WalkDir;

use arkiv_types::error::{ArkivError, Result};

use super::{ensure_exists, RawEntry, SourceReader};

/// Recursively walks directory trees. Each regular file is its own
/// locator and its file name is the grouping source.
pub struct DirectoryReader {
    roots: Vec<PathBuf>,
}

impl DirectoryReader {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl SourceReader for DirectoryReader {
    fn read(&self) -> Result<Vec<RawEntry>> {
        ensure_exists(&self.roots)?;
        let mut out = Vec::new();
        for root in &self.roots {
            let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|e| {
                    ArkivError::Source(format!("walking {}: {e}", root.display()))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                out.push(RawEntry::new(
                    entry.path().to_string_lossy().to_string(),
                    name,
                ));
            }
        }
        Ok(out)
    }
}
