use std::time::Duration;

use arkiv_types::error::{ArkivError, Result};

use crate::RetryConfig;

/// Retry a store call on transient errors with exponential backoff + jitter.
///
/// Only errors for which [`ArkivError::is_transient`] holds are retried; every
/// other error, including the idempotence signals `AlreadyExists` and
/// `DuplicatePolicy`, is returned on first sight.
pub fn retry_transient<T>(
    config: &RetryConfig,
    op_name: &str,
    store_label: &str,
    f: impl Fn() -> Result<T>,
) -> Result<T> {
    let mut delay_ms = config.retry_delay_ms;
    let mut attempt = 0usize;

    loop {
        match f() {
            Ok(val) => return Ok(val),
            Err(e) if e.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                tracing::warn!(
                    "{store_label} {op_name}: transient error (attempt {attempt}/{}), retrying: {e}",
                    config.max_retries,
                );
                let jitter = rand::random::<u64>() % delay_ms.max(1);
                std::thread::sleep(Duration::from_millis(delay_ms + jitter));
                delay_ms = (delay_ms.saturating_mul(2)).min(config.retry_max_delay_ms);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Map a `ureq` error onto the store error taxonomy.
///
/// `conflict` builds the variant a 409 stands for on this endpoint, since
/// "already exists" means different things for containers and policies.
pub fn classify_http(
    err: ureq::Error,
    what: &str,
    conflict: impl FnOnce(String) -> ArkivError,
) -> ArkivError {
    match err {
        ureq::Error::Status(409, _) => conflict(what.to_string()),
        ureq::Error::Status(404, _) => ArkivError::NotFound(what.to_string()),
        ureq::Error::Status(code @ (429 | 502 | 503 | 504), _) => {
            ArkivError::ServiceUnavailable(format!("{what}: HTTP {code}"))
        }
        ureq::Error::Status(code, resp) => {
            let body = resp.into_string().unwrap_or_default();
            ArkivError::Store(format!("{what}: HTTP {code} {}", body.trim()))
        }
        ureq::Error::Transport(t) => ArkivError::ServerConnection(format!("{what}: {t}")),
    }
}

/// Whether an I/O error is transient and worth retrying.
pub fn is_retryable_io(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted
    )
}

/// Body-read failures: transient kinds become `ServerConnection` so the retry
/// loop picks them up; the rest stay plain I/O errors.
pub fn classify_body_io(err: std::io::Error, what: &str) -> ArkivError {
    if is_retryable_io(&err) {
        ArkivError::ServerConnection(format!("{what}: body read: {err}"))
    } else {
        ArkivError::Io(err)
    }
}
