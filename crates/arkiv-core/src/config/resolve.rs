use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use arkiv_types::error::{ArkivError, Result};
use arkiv_types::identity::{validate_scope, validate_template};

use super::defaults::{parse_human_duration, MAX_WORKERS};
use super::types::{ArkivConfig, ConfigDocument, SourceEntry, TransferConfig};
use super::util::expand_tilde;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ARKIV_CONFIG";

/// Expand `${VAR}` and `${VAR:-default}` placeholders in raw config text.
fn expand_env_placeholders(input: &str, path: &Path) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0usize;

    while let Some(offset) = input[cursor..].find("${") {
        let start = cursor + offset;
        out.push_str(&input[cursor..start]);

        let token_start = start + 2;
        let Some(token_end_rel) = input[token_start..].find('}') else {
            return Err(config_expand_error(
                path,
                input,
                start,
                "unterminated environment placeholder",
            ));
        };
        let token_end = token_start + token_end_rel;
        let token = &input[token_start..token_end];
        let replacement = resolve_env_token(token, path, input, start)?;
        out.push_str(&replacement);
        cursor = token_end + 1;
    }

    out.push_str(&input[cursor..]);
    Ok(out)
}

fn resolve_env_token(token: &str, path: &Path, input: &str, start: usize) -> Result<String> {
    if token.is_empty() {
        return Err(config_expand_error(
            path,
            input,
            start,
            "empty environment placeholder",
        ));
    }

    if let Some((name, default)) = token.split_once(":-") {
        if !is_valid_env_var_name(name) {
            return Err(config_expand_error(
                path,
                input,
                start,
                format!("invalid environment variable name '{name}'"),
            ));
        }

        return match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(default.to_string()),
            Err(std::env::VarError::NotUnicode(_)) => Err(config_expand_error(
                path,
                input,
                start,
                format!("environment variable '{name}' is not valid UTF-8"),
            )),
        };
    }

    if !is_valid_env_var_name(token) {
        return Err(config_expand_error(
            path,
            input,
            start,
            format!("invalid environment placeholder '{token}'"),
        ));
    }

    match std::env::var(token) {
        Ok(value) => Ok(value),
        Err(std::env::VarError::NotPresent) => Err(config_expand_error(
            path,
            input,
            start,
            format!("environment variable '{token}' is not set"),
        )),
        Err(std::env::VarError::NotUnicode(_)) => Err(config_expand_error(
            path,
            input,
            start,
            format!("environment variable '{token}' is not valid UTF-8"),
        )),
    }
}

fn is_valid_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return false;
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn config_expand_error(
    path: &Path,
    input: &str,
    start: usize,
    message: impl fmt::Display,
) -> ArkivError {
    let (line, column) = byte_offset_to_line_col(input, start);
    ArkivError::Config(format!(
        "invalid config '{}': {message} at line {line}, column {column}",
        path.display()
    ))
}

fn byte_offset_to_line_col(input: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut column = 1usize;
    for ch in input[..byte_offset].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Load, expand, parse and validate a config file.
pub fn load_and_resolve(path: &Path) -> Result<ArkivConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ArkivError::Config(format!("cannot read '{}': {e}", path.display())))?;
    parse_config(&contents, path)
}

/// Parse config text; `origin` is only used in error messages.
pub fn parse_config(contents: &str, origin: &Path) -> Result<ArkivConfig> {
    let expanded = expand_env_placeholders(contents, origin)?;
    let raw: ConfigDocument = serde_yaml::from_str(&expanded)
        .map_err(|e| ArkivError::Config(format!("invalid config '{}': {e}", origin.display())))?;
    resolve_document(raw)
}

fn resolve_document(raw: ConfigDocument) -> Result<ArkivConfig> {
    validate_scope(&raw.scope)?;
    validate_template(&raw.container_template)?;

    for (key, value) in [
        ("upload_location", &raw.upload_location),
        ("destination_location", &raw.destination_location),
    ] {
        if value.trim().is_empty() {
            return Err(ArkivError::Config(format!("'{key}' must not be empty")));
        }
    }

    if raw.replicas == 0 {
        return Err(ArkivError::Config("'replicas' must be at least 1".into()));
    }

    // Anchored at the start of the source name, like a prefix match.
    let grouping_pattern = Regex::new(&format!("^(?:{})", raw.grouping_pattern)).map_err(|e| {
        ArkivError::Config(format!(
            "invalid grouping_pattern '{}': {e}",
            raw.grouping_pattern
        ))
    })?;
    if grouping_pattern.captures_len() < 2 {
        return Err(ArkivError::Config(format!(
            "grouping_pattern '{}' needs a capture group for the grouping key",
            raw.grouping_pattern
        )));
    }

    let workers = raw.transfer.workers;
    if !(1..=MAX_WORKERS).contains(&workers) {
        return Err(ArkivError::Config(format!(
            "transfer.workers must be between 1 and {MAX_WORKERS}, got {workers}"
        )));
    }
    let min_attempt = parse_human_duration(&raw.transfer.min_attempt)?;

    if let Some(locator) = &raw.locator {
        if locator.remote_prefix.is_empty() {
            return Err(ArkivError::Config(
                "locator.remote_prefix must not be empty".into(),
            ));
        }
    }

    if raw.sources.is_empty() {
        return Err(ArkivError::Config("'sources:' must not be empty".into()));
    }
    let mut sources = Vec::with_capacity(raw.sources.len());
    for (i, section) in raw.sources.into_iter().enumerate() {
        if section.paths.is_empty() {
            return Err(ArkivError::Config(format!(
                "sources[{i}] ({:?}) has no paths",
                section.kind
            )));
        }
        sources.push(SourceEntry {
            kind: section.kind,
            paths: section.paths.iter().map(|p| expand_tilde(p)).collect(),
        });
    }

    Ok(ArkivConfig {
        store: raw.store.into(),
        scope: raw.scope,
        upload_location: raw.upload_location,
        destination_location: raw.destination_location,
        replicas: raw.replicas,
        container_template: raw.container_template,
        grouping_pattern,
        register_after_transfer: raw.register_after_transfer,
        zero_size: raw.zero_size,
        locator: raw.locator,
        transfer: TransferConfig {
            workers,
            min_attempt,
        },
        audit_log_dir: expand_tilde(&raw.audit_log_dir),
        sources,
    })
}

// --- Config resolution ---

/// Tracks where the config file was found.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Explicitly passed via `--config`.
    CliArg(PathBuf),
    /// Set via the `ARKIV_CONFIG` env var.
    EnvVar(PathBuf),
    /// Found by searching standard locations.
    SearchOrder { path: PathBuf, level: &'static str },
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::CliArg(p) => p,
            ConfigSource::EnvVar(p) => p,
            ConfigSource::SearchOrder { path, .. } => path,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CliArg(p) => write!(f, "{} (--config)", p.display()),
            ConfigSource::EnvVar(p) => write!(f, "{} ({CONFIG_ENV_VAR})", p.display()),
            ConfigSource::SearchOrder { path, level } => {
                write!(f, "{} ({})", path.display(), level)
            }
        }
    }
}

/// Returns search locations in priority order: project, user, system.
pub fn default_config_search_paths() -> Vec<(PathBuf, &'static str)> {
    let mut paths = vec![(PathBuf::from("arkiv.yaml"), "project")];

    let user_config = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|base| base.join("arkiv").join("config.yaml"));

    if let Some(p) = user_config {
        paths.push((p, "user"));
    }

    paths.push((PathBuf::from("/etc/arkiv/config.yaml"), "system"));

    paths
}

/// Resolve which config file to use.
///
/// Priority: CLI arg > `ARKIV_CONFIG` env var > first existing file from search paths.
/// Returns `None` if nothing is found.
pub fn resolve_config_path(cli_config: Option<&str>) -> Option<ConfigSource> {
    if let Some(path) = cli_config {
        return Some(ConfigSource::CliArg(PathBuf::from(path)));
    }

    if let Ok(val) = std::env::var(CONFIG_ENV_VAR) {
        if !val.is_empty() {
            return Some(ConfigSource::EnvVar(PathBuf::from(val)));
        }
    }

    default_config_search_paths()
        .into_iter()
        .find(|(path, _)| path.exists())
        .map(|(path, level)| ConfigSource::SearchOrder { path, level })
}

/// Returns a starter YAML config suitable for bootstrapping.
pub fn minimal_config_template() -> &'static str {
    r#"# arkiv configuration file

store:
  url: https://catalog.example.org
  token: "${ARKIV_TOKEN:-}"

scope: user.example
upload_location: SITE_A_DISK
destination_location: SITE_B_TAPE

# Grouping key is capture group 1 of this pattern, applied to the source name.
grouping_pattern: "run_([0-9]{4})_filelist.dat"
container_template: "run-{}-raw"

sources:
  - kind: file_list
    paths: [/path/to/lists]

# --- Common optional settings (uncomment as needed) ---

# replicas: 1
# register_after_transfer: true
# zero_size: skip
#
# locator:
#   remote_prefix: "gsiftp://host:2811/pnfs/example/usr"
#   local_prefix: "/pnfs"
#   strict: false
#
# transfer:
#   workers: 20
#   min_attempt: 60s
#
# audit_log_dir: /var/log/arkiv
"#
}
