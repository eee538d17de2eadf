use std::path::PathBuf;

use arkiv_types::error::{ArkivError, Result};

use crate::config::LocatorConfig;

/// Maps remote access locators (e.g. `gsiftp://host/pnfs/...`) onto the
/// local mount that exposes the same files.
#[derive(Debug, Clone, Default)]
pub struct LocatorTranslator {
    rule: Option<LocatorConfig>,
}

impl LocatorTranslator {
    pub fn new(rule: Option<LocatorConfig>) -> Self {
        Self { rule }
    }

    /// Translate one locator into a local path.
    ///
    /// Without a configured rule the locator already is a local path. With a
    /// rule, a locator that lacks the remote prefix is passed through with a
    /// warning, or rejected as `UntranslatableLocator` in strict mode.
    pub fn local_path_from_remote_locator(&self, locator: &str) -> Result<PathBuf> {
        let Some(rule) = &self.rule else {
            return Ok(PathBuf::from(locator));
        };
        if let Some(rest) = locator.strip_prefix(&rule.remote_prefix) {
            return Ok(PathBuf::from(format!("{}{rest}", rule.local_prefix)));
        }
        if rule.strict {
            return Err(ArkivError::UntranslatableLocator(locator.to_string()));
        }
        tracing::warn!(
            locator,
            remote_prefix = %rule.remote_prefix,
            "locator lacks the remote prefix, using it verbatim"
        );
        Ok(PathBuf::from(locator))
    }
}
