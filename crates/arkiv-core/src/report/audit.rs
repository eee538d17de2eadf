use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;

const RULE_WIDTH: usize = 46;

/// Severity of an audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl AuditLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditLevel::Debug => "DEBUG",
            AuditLevel::Info => "INFO",
            AuditLevel::Warn => "WARN",
            AuditLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Sink {
    Writer(Box<dyn Write + Send>),
    Memory(Vec<u8>),
}

/// Append-only, human-readable record of one run.
///
/// Clones share the sink; every line is written whole under one lock, so
/// transfer workers can log concurrently without interleaving.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<Mutex<Sink>>,
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

impl AuditLog {
    /// Create `arkiv_%Y_%m_%d_%H_%M_%S.log` under `dir`.
    pub fn create_in(dir: &Path) -> io::Result<(Self, PathBuf)> {
        fs::create_dir_all(dir)?;
        let name = Local::now().format("arkiv_%Y_%m_%d_%H_%M_%S.log").to_string();
        let path = dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((Self::to_writer(Box::new(file)), path))
    }

    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Writer(writer))),
        }
    }

    /// Keeps every line in memory; read back with [`AuditLog::contents`].
    pub fn in_memory() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Memory(Vec::new()))),
        }
    }

    /// Drops every line (tracing still sees them).
    pub fn discard() -> Self {
        Self::to_writer(Box::new(io::sink()))
    }

    /// Text captured by an in-memory log; `None` for other sinks.
    pub fn contents(&self) -> Option<String> {
        let sink = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        match &*sink {
            Sink::Memory(buf) => Some(String::from_utf8_lossy(buf).into_owned()),
            Sink::Writer(_) => None,
        }
    }

    pub fn log(&self, level: AuditLevel, message: impl AsRef<str>) {
        let message = message.as_ref();
        match level {
            AuditLevel::Debug => tracing::debug!("{message}"),
            AuditLevel::Info => tracing::info!("{message}"),
            AuditLevel::Warn => tracing::warn!("{message}"),
            AuditLevel::Error => tracing::error!("{message}"),
        }

        let line = format!(
            "{} [{level}] : {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        );
        // A poisoned lock only means another writer panicked mid-line.
        let mut sink = self.sink.lock().unwrap_or_else(|p| p.into_inner());
        let written = match &mut *sink {
            Sink::Writer(w) => w.write_all(line.as_bytes()).and_then(|_| w.flush()),
            Sink::Memory(buf) => {
                buf.extend_from_slice(line.as_bytes());
                Ok(())
            }
        };
        if let Err(e) = written {
            tracing::error!("audit log write failed: {e}");
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(AuditLevel::Info, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(AuditLevel::Warn, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(AuditLevel::Error, message);
    }

    /// Opening banner of a delimited section.
    pub fn section(&self, level: AuditLevel, title: &str) {
        let head = format!(" ============ {title} ");
        let pad = RULE_WIDTH.saturating_sub(head.len()).max(3);
        self.log(level, format!("{head}{}", "=".repeat(pad)));
    }

    /// Closing rule of a delimited section.
    pub fn end_section(&self, level: AuditLevel) {
        self.log(level, format!(" {}", "=".repeat(RULE_WIDTH - 1)));
    }

    /// A whole section: banner, one line per row, closing rule.
    pub fn table<I, S>(&self, level: AuditLevel, title: &str, rows: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.section(level, title);
        for row in rows {
            self.log(level, format!("   {}", row.as_ref()));
        }
        self.end_section(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_timestamp_and_level() {
        let log = AuditLog::in_memory();
        log.info("hello");
        log.warn("careful");
        let text = log.contents().unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] : hello"), "got: {}", lines[0]);
        assert!(lines[1].ends_with("[WARN] : careful"), "got: {}", lines[1]);
        // "YYYY-mm-dd HH:MM:SS.mmm"
        let stamp = lines[0].split(" [").next().unwrap();
        assert_eq!(stamp.len(), 23, "got: {stamp}");
        assert_eq!(&stamp[19..20], ".");
    }

    #[test]
    fn clones_share_the_sink() {
        let log = AuditLog::in_memory();
        let other = log.clone();
        other.info("from clone");
        assert!(log.contents().unwrap().contains("from clone"));
    }

    #[test]
    fn table_is_delimited() {
        let log = AuditLog::in_memory();
        log.table(AuditLevel::Info, "containers to add", ["s:run-1-raw", "s:run-2-raw"]);
        let text = log.contents().unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("============ containers to add ="));
        assert!(lines[1].ends_with(":    s:run-1-raw"));
        assert!(lines[3].ends_with(&"=".repeat(RULE_WIDTH - 1)));
    }

    #[test]
    fn concurrent_writers_do_not_interleave() {
        let log = AuditLog::in_memory();
        std::thread::scope(|s| {
            for t in 0..4 {
                let log = log.clone();
                s.spawn(move || {
                    for i in 0..50 {
                        log.info(format!("worker {t} line {i}"));
                    }
                });
            }
        });
        let text = log.contents().unwrap();
        assert_eq!(text.lines().count(), 200);
        assert!(text.lines().all(|l| l.contains("[INFO] : worker ")));
    }

    #[test]
    fn file_sink_uses_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let (log, path) = AuditLog::create_in(&dir.path().join("logs")).unwrap();
        log.info("to disk");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("arkiv_") && name.ends_with(".log"), "got: {name}");
        assert!(fs::read_to_string(&path).unwrap().contains("to disk"));
        assert!(log.contents().is_none());
    }
}
