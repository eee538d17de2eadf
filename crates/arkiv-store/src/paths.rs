use std::path::PathBuf;

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

use arkiv_types::ScopedName;

/// Suffix of the temp file a replica is staged under before its final rename.
pub const PARTIAL_SUFFIX: &str = ".arkiv.upload";

/// Unkeyed BLAKE2b-256 of `data` as 64 hex chars.
pub fn blake2b_256_hex(data: &[u8]) -> String {
    let mut hasher = Blake2bVar::new(32).expect("valid output size");
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize_variable(&mut out).expect("correct length");
    hex::encode(out)
}

/// Deterministic replica path relative to a location root:
/// `<h[0..2]>/<h[2..4]>/<name>`, `h` being the digest of `scope:name`.
pub fn replica_relative_path(id: &ScopedName) -> PathBuf {
    let digest = blake2b_256_hex(id.to_wire().as_bytes());
    PathBuf::from(&digest[..2]).join(&digest[2..4]).join(&id.name)
}

/// The staging path next to a replica path.
pub fn partial_path(replica: &std::path::Path) -> PathBuf {
    let mut os = replica.as_os_str().to_owned();
    os.push(PARTIAL_SUFFIX);
    PathBuf::from(os)
}
