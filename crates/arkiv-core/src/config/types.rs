use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use arkiv_store::{RetryConfig, StoreConfig};
use arkiv_types::error::{ArkivError, Result};

use super::defaults::*;
use super::deserialize::*;

/// Store connection section as written in YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct StoreSection {
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_optional_strict_string")]
    pub token: Option<String>,
    #[serde(default)]
    pub allow_insecure_http: bool,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl From<StoreSection> for StoreConfig {
    fn from(s: StoreSection) -> Self {
        StoreConfig {
            url: s.url,
            token: s.token.filter(|t| !t.is_empty()),
            allow_insecure_http: s.allow_insecure_http,
            retry: s.retry,
        }
    }
}

/// What to do with source files that are zero bytes long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSizePolicy {
    /// Keep them out of the item set; they are reported separately.
    #[default]
    Skip,
    /// Treat them like any other item.
    Include,
}

/// Remote-locator to local-path translation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocatorConfig {
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub remote_prefix: String,
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub local_prefix: String,
    /// An untranslatable locator aborts the run instead of being logged.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct TransferSection {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(
        default = "default_min_attempt",
        deserialize_with = "deserialize_duration_string"
    )]
    pub min_attempt: String,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            min_attempt: default_min_attempt(),
        }
    }
}

/// Transfer-phase tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Number of concurrent transfer workers.
    pub workers: usize,
    /// Minimum wall-clock time spent on each item attempt.
    pub min_attempt: Duration,
}

impl TransferConfig {
    /// Apply command-line overrides, validated like the config file values.
    pub fn with_overrides(
        self,
        workers: Option<usize>,
        min_attempt: Option<Duration>,
    ) -> Result<Self> {
        let workers = workers.unwrap_or(self.workers);
        if !(1..=MAX_WORKERS).contains(&workers) {
            return Err(ArkivError::Config(format!(
                "workers must be between 1 and {MAX_WORKERS}, got {workers}"
            )));
        }
        Ok(Self {
            workers,
            min_attempt: min_attempt.unwrap_or(self.min_attempt),
        })
    }
}

/// Which reader turns a source path into raw entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Directory,
    FileList,
    Tar,
    RecoveryLog,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct SourceSection {
    pub kind: SourceKind,
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub paths: Vec<String>,
}

/// One configured input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub kind: SourceKind,
    pub paths: Vec<PathBuf>,
}

/// The config document as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ConfigDocument {
    pub store: StoreSection,
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub scope: String,
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub upload_location: String,
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub destination_location: String,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(
        default = "default_container_template",
        deserialize_with = "deserialize_strict_string"
    )]
    pub container_template: String,
    #[serde(deserialize_with = "deserialize_strict_string")]
    pub grouping_pattern: String,
    #[serde(default = "default_register_after_transfer")]
    pub register_after_transfer: bool,
    #[serde(default)]
    pub zero_size: ZeroSizePolicy,
    #[serde(default)]
    pub locator: Option<LocatorConfig>,
    #[serde(default)]
    pub transfer: TransferSection,
    #[serde(
        default = "default_audit_log_dir",
        deserialize_with = "deserialize_strict_string"
    )]
    pub audit_log_dir: String,
    #[serde(default)]
    pub sources: Vec<SourceSection>,
}

/// Fully validated run configuration.
#[derive(Debug, Clone)]
pub struct ArkivConfig {
    pub store: StoreConfig,
    /// Namespace every item and container identity lives in.
    pub scope: String,
    /// Storage location items are transferred to.
    pub upload_location: String,
    /// Storage location container policies replicate to.
    pub destination_location: String,
    pub replicas: u32,
    /// Container-name template with exactly one `{}`.
    pub container_template: String,
    /// Extracts the grouping key (capture group 1) from a source name.
    pub grouping_pattern: Regex,
    pub register_after_transfer: bool,
    pub zero_size: ZeroSizePolicy,
    pub locator: Option<LocatorConfig>,
    pub transfer: TransferConfig,
    pub audit_log_dir: PathBuf,
    pub sources: Vec<SourceEntry>,
}
