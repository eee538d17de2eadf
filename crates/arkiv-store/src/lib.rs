pub mod local_backend;
pub mod paths;
pub mod rest_backend;
pub mod retry;

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::request::{AttachRequest, PolicySpec, TransferReceipt, TransferRequest};
use arkiv_types::ScopedName;

pub use local_backend::LocalCatalog;
pub use rest_backend::RestCatalog;

/// Query/mutate capabilities of a remote catalog-and-replication service.
///
/// Implementations must be usable from several worker threads at once.
/// Conflict outcomes are reported as errors (`AlreadyExists`,
/// `DuplicatePolicy`); callers decide whether those count as success.
pub trait CatalogStore: Send + Sync {
    /// File-type identities registered under `scope`.
    fn list_items(&self, scope: &str) -> Result<HashSet<ScopedName>>;

    /// Container identities registered under `scope`.
    fn list_containers(&self, scope: &str) -> Result<HashSet<ScopedName>>;

    /// Identities attached to one container.
    fn list_container_members(&self, container: &ScopedName) -> Result<HashSet<ScopedName>>;

    /// Containers holding a replication policy that targets `location`.
    fn list_policies(&self, location: &str) -> Result<HashSet<ScopedName>>;

    fn create_container(&self, container: &ScopedName) -> Result<()>;

    fn create_policy(&self, policy: &PolicySpec) -> Result<()>;

    fn attach_members(&self, container: &ScopedName, items: &[AttachRequest]) -> Result<()>;

    /// Copy the file at `request.path` into `request.location`, register it
    /// and attach it to `request.container`. `register_after_transfer`
    /// orders registration after the copy instead of before it.
    fn transfer_item(&self, request: &TransferRequest) -> Result<TransferReceipt>;

    /// Remove whatever an interrupted transfer of `request` left behind.
    fn clear_partial_transfer(&self, _request: &TransferRequest) -> Result<()> {
        Ok(())
    }
}

/// Opens independent store handles, one per transfer worker.
pub trait StoreConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn CatalogStore>>;
}

/// Retry configuration for remote store calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

/// Connection settings for a catalog store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: String,
    pub token: Option<String>,
    pub allow_insecure_http: bool,
    pub retry: RetryConfig,
}

/// Backend selected by the shape of a store URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUrl {
    Rest { url: String },
    Local { path: PathBuf },
}

/// Classify a store URL: `http(s)://` selects REST, `file://` or a bare path
/// selects the local filesystem catalog.
pub fn parse_store_url(raw: &str) -> Result<ParsedUrl> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(ArkivError::Config("store.url must not be empty".into()));
    }
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(ParsedUrl::Rest {
            url: url.trim_end_matches('/').to_string(),
        });
    }
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(ArkivError::Config(format!("store URL '{raw}' has no path")));
        }
        return Ok(ParsedUrl::Local {
            path: PathBuf::from(path),
        });
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(ArkivError::UnsupportedStore(scheme.to_string()));
    }
    Ok(ParsedUrl::Local {
        path: PathBuf::from(url),
    })
}

/// Build a store backend from its configuration.
pub fn backend_from_config(cfg: &StoreConfig) -> Result<Box<dyn CatalogStore>> {
    match parse_store_url(&cfg.url)? {
        ParsedUrl::Rest { url } => {
            if url.starts_with("http://") && !cfg.allow_insecure_http {
                return Err(ArkivError::Config(format!(
                    "refusing plaintext store URL '{url}' (set store.allow_insecure_http to override)"
                )));
            }
            Ok(Box::new(RestCatalog::new(
                &url,
                cfg.token.as_deref(),
                cfg.retry.clone(),
            )))
        }
        ParsedUrl::Local { path } => Ok(Box::new(LocalCatalog::open(&path)?)),
    }
}

impl StoreConnector for StoreConfig {
    fn connect(&self) -> Result<Box<dyn CatalogStore>> {
        backend_from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rest_urls() {
        assert_eq!(
            parse_store_url("https://catalog.example.org/").unwrap(),
            ParsedUrl::Rest {
                url: "https://catalog.example.org".into()
            }
        );
        assert!(matches!(
            parse_store_url("http://localhost:8080").unwrap(),
            ParsedUrl::Rest { .. }
        ));
    }

    #[test]
    fn parse_local_urls() {
        assert_eq!(
            parse_store_url("file:///srv/catalog").unwrap(),
            ParsedUrl::Local {
                path: PathBuf::from("/srv/catalog")
            }
        );
        assert_eq!(
            parse_store_url("/srv/catalog").unwrap(),
            ParsedUrl::Local {
                path: PathBuf::from("/srv/catalog")
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_schemes_and_empty() {
        assert!(matches!(
            parse_store_url("s3://bucket"),
            Err(ArkivError::UnsupportedStore(ref s)) if s == "s3"
        ));
        assert!(parse_store_url("  ").is_err());
        assert!(parse_store_url("file://").is_err());
    }

    #[test]
    fn plaintext_rest_requires_opt_in() {
        let mut cfg = StoreConfig {
            url: "http://catalog.local".into(),
            token: None,
            allow_insecure_http: false,
            retry: RetryConfig::default(),
        };
        assert!(matches!(
            backend_from_config(&cfg),
            Err(ArkivError::Config(_))
        ));
        cfg.allow_insecure_http = true;
        assert!(backend_from_config(&cfg).is_ok());
    }
}
