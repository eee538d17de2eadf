use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ArkivError, Result};

/// Separator between scope and name in the wire form `scope:name`.
pub const SCOPE_SEPARATOR: char = ':';

/// Placeholder a container-name template substitutes the grouping key into.
pub const TEMPLATE_PLACEHOLDER: &str = "{}";

/// A `(scope, name)` pair identifying an item, container or policy.
///
/// All in-process comparisons use the structured pair. The `scope:name`
/// string exists only for display and for crossing the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopedName {
    pub scope: String,
    pub name: String,
}

impl ScopedName {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Parse the wire form produced by [`ScopedName::to_wire`].
    ///
    /// Splits at the first separator. Scopes never contain one (see
    /// [`validate_scope`]), so names that do still round-trip.
    pub fn parse(wire: &str) -> Result<Self> {
        let (scope, name) = wire
            .split_once(SCOPE_SEPARATOR)
            .ok_or_else(|| ArkivError::MalformedIdentifier(wire.to_string()))?;
        if scope.is_empty() || name.is_empty() {
            return Err(ArkivError::MalformedIdentifier(wire.to_string()));
        }
        Ok(Self::new(scope, name))
    }

    pub fn to_wire(&self) -> String {
        scoped_name(&self.name, &self.scope)
    }
}

impl fmt::Display for ScopedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCOPE_SEPARATOR}{}", self.scope, self.name)
    }
}

/// Canonical `scope:name` string.
pub fn scoped_name(name: &str, scope: &str) -> String {
    format!("{scope}{SCOPE_SEPARATOR}{name}")
}

/// Inverse of [`scoped_name`]: returns `(scope, name)`.
pub fn parse_scoped_name(wire: &str) -> Result<(String, String)> {
    ScopedName::parse(wire).map(|id| (id.scope, id.name))
}

/// Reject scopes that would make the wire form ambiguous.
pub fn validate_scope(scope: &str) -> Result<()> {
    if scope.is_empty() {
        return Err(ArkivError::Config("scope must not be empty".into()));
    }
    if scope.contains(SCOPE_SEPARATOR) {
        return Err(ArkivError::Config(format!(
            "scope '{scope}' must not contain '{SCOPE_SEPARATOR}'"
        )));
    }
    if scope.chars().any(char::is_whitespace) {
        return Err(ArkivError::Config(format!(
            "scope '{scope}' must not contain whitespace"
        )));
    }
    Ok(())
}

/// A container-name template must carry exactly one `{}` placeholder.
pub fn validate_template(template: &str) -> Result<()> {
    let count = template.matches(TEMPLATE_PLACEHOLDER).count();
    if count != 1 {
        return Err(ArkivError::Config(format!(
            "container template '{template}' must contain exactly one '{{}}', found {count}"
        )));
    }
    Ok(())
}

/// Apply a template such as `run-{}-raw` to a grouping key.
pub fn container_name(grouping_key: &str, template: &str) -> String {
    template.replacen(TEMPLATE_PLACEHOLDER, grouping_key, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_round_trips() {
        let id = ScopedName::new("user.icarus", "file_001.root");
        assert_eq!(id.to_wire(), "user.icarus:file_001.root");
        assert_eq!(ScopedName::parse(&id.to_wire()).unwrap(), id);
        assert_eq!(id.to_string(), id.to_wire());
    }

    #[test]
    fn names_containing_separator_round_trip() {
        let id = ScopedName::new("user.icarus", "odd:name:here");
        let parsed = ScopedName::parse(&id.to_wire()).unwrap();
        assert_eq!(parsed.scope, "user.icarus");
        assert_eq!(parsed.name, "odd:name:here");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = parse_scoped_name("no-separator").unwrap_err();
        assert!(matches!(err, ArkivError::MalformedIdentifier(ref s) if s == "no-separator"));
    }

    #[test]
    fn parse_rejects_empty_halves() {
        assert!(ScopedName::parse(":name").is_err());
        assert!(ScopedName::parse("scope:").is_err());
    }

    #[test]
    fn container_name_applies_template() {
        assert_eq!(container_name("0042", "run-{}-raw"), "run-0042-raw");
        assert_eq!(container_name("7", "{}"), "7");
    }

    #[test]
    fn template_validation() {
        assert!(validate_template("run-{}-raw").is_ok());
        assert!(validate_template("run-raw").is_err());
        assert!(validate_template("{}-{}").is_err());
    }

    #[test]
    fn scope_validation() {
        assert!(validate_scope("user.icaruspro").is_ok());
        assert!(validate_scope("").is_err());
        assert!(validate_scope("a:b").is_err());
        assert!(validate_scope("a b").is_err());
    }
}
