use std::path::PathBuf;

use thiserror::Error;

use crate::identity::ScopedName;

pub type Result<T> = std::result::Result<T, ArkivError>;

#[derive(Debug, Error)]
pub enum ArkivError {
    #[error("malformed identifier: '{0}'")]
    MalformedIdentifier(String),

    #[error(
        "naming collision on {identity}: '{}' and '{}' differ in content",
        first.display(),
        second.display()
    )]
    NamingCollision {
        identity: ScopedName,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("locator '{0}' does not start with the configured remote prefix")]
    UntranslatableLocator(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("duplicate policy: {0}")]
    DuplicatePolicy(String),

    #[error("server connection failed: {0}")]
    ServerConnection(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("no files transferred: {0}")]
    NoFilesTransferred(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("unsupported store: '{0}'")]
    UnsupportedStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ArkivError {
    /// Short, stable label used in audit lines and structured log fields.
    pub fn failure_kind(&self) -> &'static str {
        match self {
            ArkivError::MalformedIdentifier(_) => "malformed-identifier",
            ArkivError::NamingCollision { .. } => "naming-collision",
            ArkivError::UntranslatableLocator(_) => "untranslatable-locator",
            ArkivError::Source(_) => "source",
            ArkivError::Config(_) => "config",
            ArkivError::AlreadyExists(_) => "already-exists",
            ArkivError::DuplicatePolicy(_) => "duplicate-policy",
            ArkivError::ServerConnection(_) => "server-connection",
            ArkivError::NotFound(_) => "not-found",
            ArkivError::ServiceUnavailable(_) => "service-unavailable",
            ArkivError::NoFilesTransferred(_) => "no-files-transferred",
            ArkivError::Store(_) => "store",
            ArkivError::UnsupportedStore(_) => "unsupported-store",
            ArkivError::Io(_) => "io",
            ArkivError::Json(_) => "json",
            ArkivError::Other(_) => "other",
        }
    }

    /// Whether a single RPC may succeed if repeated shortly after.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ArkivError::ServerConnection(_) | ArkivError::ServiceUnavailable(_)
        )
    }

    /// Failures the transfer engine records against an item and moves past.
    /// Everything a store can report lands here; local I/O on the source file
    /// does too, since the next run will try the item again.
    pub fn is_recoverable_transfer_failure(&self) -> bool {
        !matches!(
            self,
            ArkivError::NamingCollision { .. }
                | ArkivError::MalformedIdentifier(_)
                | ArkivError::Config(_)
                | ArkivError::UntranslatableLocator(_)
                | ArkivError::Source(_)
        )
    }
}
