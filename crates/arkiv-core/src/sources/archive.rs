use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use arkiv_types::error::{ArkivError, Result};

use super::{ensure_exists, read_list_lines, RawEntry, SourceReader};

/// Reads gzipped tar archives whose regular members are list files. The
/// member name is the grouping source of every locator it lists.
pub struct TarListReader {
    archives: Vec<PathBuf>,
}

impl TarListReader {
    pub fn new(archives: Vec<PathBuf>) -> Self {
        Self { archives }
    }
}

impl SourceReader for TarListReader {
    fn read(&self) -> Result<Vec<RawEntry>> {
        ensure_exists(&self.archives)?;
        let mut out = Vec::new();
        for path in &self.archives {
            let unreadable =
                |e: std::io::Error| ArkivError::Source(format!("cannot read {}: {e}", path.display()));
            let file = File::open(path).map_err(unreadable)?;
            let mut archive = Archive::new(GzDecoder::new(file));
            for member in archive.entries().map_err(unreadable)? {
                let member = member.map_err(unreadable)?;
                if member.header().entry_type() != EntryType::Regular {
                    continue;
                }
                let name = member
                    .path()
                    .map_err(unreadable)?
                    .to_string_lossy()
                    .to_string();
                out.extend(read_list_lines(BufReader::new(member), &name, path)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::path::Path;

    fn write_tgz(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, body) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn members_become_list_files() {
        let dir = tempfile::tempdir().unwrap();
        let tgz = dir.path().join("lists.tgz");
        write_tgz(
            &tgz,
            &[
                ("run_0042_filelist.dat", "gsiftp://d/pnfs/a.dat\ngsiftp://d/pnfs/b.dat\n"),
                ("run_0043_filelist.dat", "\ngsiftp://d/pnfs/c.dat\n"),
            ],
        );

        let entries = TarListReader::new(vec![tgz]).read().unwrap();
        assert_eq!(
            entries,
            vec![
                RawEntry::new("gsiftp://d/pnfs/a.dat", "run_0042_filelist.dat"),
                RawEntry::new("gsiftp://d/pnfs/b.dat", "run_0042_filelist.dat"),
                RawEntry::new("gsiftp://d/pnfs/c.dat", "run_0043_filelist.dat"),
            ]
        );
    }

    #[test]
    fn corrupt_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let tgz = dir.path().join("bad.tgz");
        std::fs::write(&tgz, b"definitely not gzip").unwrap();
        let err = TarListReader::new(vec![tgz]).read().unwrap_err();
        assert!(matches!(err, ArkivError::Source(_)), "got: {err}");
    }
}
