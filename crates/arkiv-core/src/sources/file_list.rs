use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use regex::Regex;

use arkiv_types::error::{ArkivError, Result};

use super::{ensure_exists, read_list_lines, RawEntry, SourceReader};

/// Reads directories of per-run list files. Only list files whose name
/// matches the grouping pattern are read; each of their lines is a locator.
pub struct FileListReader {
    dirs: Vec<PathBuf>,
    pattern: Regex,
}

impl FileListReader {
    pub fn new(dirs: Vec<PathBuf>, pattern: Regex) -> Self {
        Self { dirs, pattern }
    }
}

impl SourceReader for FileListReader {
    fn read(&self) -> Result<Vec<RawEntry>> {
        ensure_exists(&self.dirs)?;
        let mut out = Vec::new();
        for dir in &self.dirs {
            let listing = fs::read_dir(dir)
                .map_err(|e| ArkivError::Source(format!("cannot list {}: {e}", dir.display())))?;
            let mut lists = Vec::new();
            for entry in listing {
                let entry = entry.map_err(|e| {
                    ArkivError::Source(format!("cannot list {}: {e}", dir.display()))
                })?;
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.path().is_file() && self.pattern.is_match(&name) {
                    lists.push((name, entry.path()));
                } else {
                    tracing::debug!("ignoring {}", entry.path().display());
                }
            }
            lists.sort();

            for (name, path) in lists {
                let file = File::open(&path).map_err(|e| {
                    ArkivError::Source(format!("cannot open list {}: {e}", path.display()))
                })?;
                out.extend(read_list_lines(BufReader::new(file), &name, &path)?);
            }
        }
        Ok(out)
    }
}
