mod archive;
mod directory;
mod file_list;
mod recovery_log;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use regex::Regex;

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::TransferRequest;

use crate::config::{SourceEntry, SourceKind};

pub use self::archive::TarListReader;
pub use self::directory::DirectoryReader;
pub use self::file_list::FileListReader;
pub use self::recovery_log::{RecoveryLogReader, RECOVERY_MARKER};

/// One input record: where a file lives and the name its grouping key is
/// extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub locator: String,
    pub group_source: String,
    /// Set when the entry replays a request recorded by an earlier run. Its
    /// identity and container are taken from the request as-is.
    pub recovered: Option<TransferRequest>,
}

impl RawEntry {
    pub fn new(locator: impl Into<String>, group_source: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            group_source: group_source.into(),
            recovered: None,
        }
    }

    pub fn recovered(request: TransferRequest) -> Self {
        Self {
            locator: request.path.to_string_lossy().to_string(),
            group_source: request.container.name.clone(),
            recovered: Some(request),
        }
    }
}

/// Produces raw entries from one kind of input.
///
/// Readers are restartable: calling `read` again yields the same entries
/// as long as the inputs are unchanged.
pub trait SourceReader {
    fn read(&self) -> Result<Vec<RawEntry>>;
}

/// Build the reader for one configured source.
pub fn reader_for(entry: &SourceEntry, pattern: &Regex) -> Box<dyn SourceReader> {
    match entry.kind {
        SourceKind::Directory => Box::new(DirectoryReader::new(entry.paths.clone())),
        SourceKind::FileList => {
            Box::new(FileListReader::new(entry.paths.clone(), pattern.clone()))
        }
        SourceKind::Tar => Box::new(TarListReader::new(entry.paths.clone())),
        SourceKind::RecoveryLog => Box::new(RecoveryLogReader::new(entry.paths.clone())),
    }
}

/// Read every configured source in order and concatenate their entries.
pub fn read_all(sources: &[SourceEntry], pattern: &Regex) -> Result<Vec<RawEntry>> {
    let mut entries = Vec::new();
    for source in sources {
        let before = entries.len();
        entries.extend(reader_for(source, pattern).read()?);
        tracing::info!(
            kind = ?source.kind,
            entries = entries.len() - before,
            "read source"
        );
    }
    Ok(entries)
}

/// Fail with `ArkivError::Source` unless every input path exists.
pub(crate) fn ensure_exists(paths: &[PathBuf]) -> Result<()> {
    for p in paths {
        if !p.exists() {
            return Err(ArkivError::Source(format!("{} does not exist", p.display())));
        }
    }
    Ok(())
}

/// One locator per non-empty, trimmed line.
pub(crate) fn read_list_lines(
    reader: impl BufRead,
    group_source: &str,
    origin: &Path,
) -> Result<Vec<RawEntry>> {
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| {
            ArkivError::Source(format!("cannot read list {}: {e}", origin.display()))
        })?;
        let locator = line.trim();
        if !locator.is_empty() {
            out.push(RawEntry::new(locator, group_source));
        }
    }
    Ok(out)
}
