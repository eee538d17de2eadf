use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

use arkiv_types::error::Result;

const READ_CHUNK: usize = 64 * 1024;

/// Digest reported for empty files.
pub const EMPTY_DIGEST: &str = "0";

/// BLAKE2b-256 hex digest of a file's contents, read in 64 KiB chunks.
///
/// Only used to tell identically named files apart, so empty files share
/// the short sentinel [`EMPTY_DIGEST`].
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Blake2bVar::new(32).expect("valid output size");
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        total += n as u64;
        hasher.update(&buf[..n]);
    }
    if total == 0 {
        return Ok(EMPTY_DIGEST.to_string());
    }
    let mut out = [0u8; 32];
    hasher.finalize_variable(&mut out).expect("correct length");
    Ok(hex::encode(out))
}
