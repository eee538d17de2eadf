use std::time::Duration;

use arkiv_types::error::{ArkivError, Result};

pub(super) fn default_replicas() -> u32 {
    1
}

pub(super) fn default_container_template() -> String {
    "run-{}-raw".to_string()
}

pub(super) fn default_register_after_transfer() -> bool {
    true
}

pub(super) fn default_workers() -> usize {
    20
}

pub(super) fn default_min_attempt() -> String {
    "60s".to_string()
}

pub(super) fn default_audit_log_dir() -> String {
    ".".to_string()
}

pub const MAX_WORKERS: usize = 256;

/// Parse a simple duration string like "250ms", "60s", "5m" or "1h".
///
/// A bare number counts seconds. Zero is allowed and disables whatever the
/// duration throttles.
pub fn parse_human_duration(raw: &str) -> Result<Duration> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ArkivError::Config("duration must not be empty".into()));
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (num_part, unit) = input.split_at(split);

    let value: u64 = num_part
        .parse()
        .map_err(|_| ArkivError::Config(format!("invalid duration value: '{raw}'")))?;

    let duration = match unit.to_ascii_lowercase().as_str() {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
        other => {
            return Err(ArkivError::Config(format!(
                "unsupported duration suffix '{other}' in '{raw}' (use ms/s/m/h)"
            )));
        }
    };

    Ok(duration)
}
