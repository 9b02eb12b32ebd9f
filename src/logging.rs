/// Structured logging for the flood-risk service
///
/// Every record carries a severity, the part of the service it came from and
/// optionally a site id. Records go to the console and, for daemon runs, are
/// appended to a log file. Messages logged before `init_logger` are dropped,
/// which keeps library use in tests quiet.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Levels and sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Prefix used on the console when timestamps are off.
    fn glyph(self) -> &'static str {
        match self {
            LogLevel::Debug => "·",
            LogLevel::Info => " ",
            LogLevel::Warning => "⚠",
            LogLevel::Error => "✗",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// The part of the service a record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// The flood-data endpoint.
    Upstream,
    /// Local fallback synthesis.
    Simulation,
    Registry,
    Store,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DataSource::Upstream => "UPSTREAM",
            DataSource::Simulation => "SIM",
            DataSource::Registry => "REGISTRY",
            DataSource::Store => "STORE",
            DataSource::System => "SYS",
        };
        f.write_str(tag)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One log line before it is written anywhere.
pub struct LogRecord<'a> {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub source: DataSource,
    pub site_id: Option<&'a str>,
    pub message: &'a str,
}

impl LogRecord<'_> {
    fn write_origin(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)?;
        if let Some(site) = self.site_id {
            write!(f, " [{}]", site)?;
        }
        write!(f, ": {}", self.message)
    }

    /// Console form without a timestamp.
    fn compact(&self) -> String {
        struct Compact<'r, 'a>(&'r LogRecord<'a>);
        impl fmt::Display for Compact<'_, '_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "   {} ", self.0.level.glyph())?;
                self.0.write_origin(f)
            }
        }
        Compact(self).to_string()
    }
}

/// Full form: `<utc timestamp> <LEVEL> <SOURCE>[ [site]]: <message>`.
impl fmt::Display for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.at.format("%Y-%m-%d %H:%M:%S UTC"), self.level)?;
        self.write_origin(f)
    }
}

/// Formats one record as it would appear in the log file.
pub fn format_entry(level: LogLevel, source: &DataSource, site_id: Option<&str>, message: &str) -> String {
    LogRecord { at: Utc::now(), level, source: *source, site_id, message }.to_string()
}

// ---------------------------------------------------------------------------
// Global logger
// ---------------------------------------------------------------------------

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

struct Logger {
    min_level: LogLevel,
    /// Opened once at init, appended to for every record.
    file: Option<(String, File)>,
    console_timestamps: bool,
}

impl Logger {
    fn emit(&mut self, record: &LogRecord<'_>) {
        if record.level < self.min_level {
            return;
        }

        let line = if self.console_timestamps { record.to_string() } else { record.compact() };
        if record.level >= LogLevel::Warning {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }

        if let Some((path, file)) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", record) {
                eprintln!("Failed to write to log file {}: {}", path, e);
                self.file = None;
            }
        }
    }
}

/// Installs the global logger. If the log file cannot be opened, logging
/// continues on the console only.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some((path.to_string(), file)),
            Err(e) => {
                eprintln!("Cannot open log file {}: {}; logging to console only", path, e);
                None
            }
        }
    });

    if let Ok(mut slot) = LOGGER.lock() {
        *slot = Some(Logger { min_level, file, console_timestamps });
    }
}

/// Logs one record through the global logger, if installed.
pub fn log(level: LogLevel, source: DataSource, site_id: Option<&str>, message: &str) {
    if let Ok(mut slot) = LOGGER.lock() {
        if let Some(logger) = slot.as_mut() {
            logger.emit(&LogRecord { at: Utc::now(), level, source, site_id, message });
        }
    }
}

pub fn info(source: DataSource, site_id: Option<&str>, message: &str) {
    log(LogLevel::Info, source, site_id, message);
}

pub fn warn(source: DataSource, site_id: Option<&str>, message: &str) {
    log(LogLevel::Warning, source, site_id, message);
}

pub fn error(source: DataSource, site_id: Option<&str>, message: &str) {
    log(LogLevel::Error, source, site_id, message);
}

pub fn debug(source: DataSource, site_id: Option<&str>, message: &str) {
    log(LogLevel::Debug, source, site_id, message);
}

// ---------------------------------------------------------------------------
// Fetch failures
// ---------------------------------------------------------------------------

/// How surprising a fetch failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// The local backend is simply not running.
    Expected,
    /// Something answered, but with an error status or a broken payload.
    Unexpected,
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            FailureType::Expected => "EXPECTED",
            FailureType::Unexpected => "UNEXPECTED",
            FailureType::Unknown => "UNKNOWN",
        };
        f.write_str(tag)
    }
}

const EXPECTED_MARKERS: &[&str] = &["connection refused", "error trying to connect"];
const UNEXPECTED_MARKERS: &[&str] = &["http error", "parse error", "missing from payload", "invalid value"];

/// Classifies a fetch failure from its error text.
pub fn classify_fetch_failure(error_message: &str) -> FailureType {
    let lower = error_message.to_ascii_lowercase();
    if EXPECTED_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureType::Expected
    } else if UNEXPECTED_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Logs a recovered fetch failure. Expected failures are debug noise; the
/// rest are warnings. Never logged as errors, since a fallback follows.
pub fn log_fetch_failure(site_id: Option<&str>, operation: &str, err: &dyn std::error::Error) {
    let text = err.to_string();
    let kind = classify_fetch_failure(&text);
    let level = match kind {
        FailureType::Expected => LogLevel::Debug,
        FailureType::Unexpected | FailureType::Unknown => LogLevel::Warning,
    };
    log(level, DataSource::Upstream, site_id, &format!("{} failed [{}]: {}", operation, kind, text));
}

/// Logs how many sites in a batch came from upstream versus the fallback.
pub fn log_refresh_summary(source: DataSource, total: usize, live: usize, fallback: usize) {
    let level = if fallback == 0 { LogLevel::Info } else { LogLevel::Warning };
    log(
        level,
        source,
        None,
        &format!("Refresh complete: {}/{} live, {} simulated", live, total, fallback),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("Warning".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("ERROR".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_fetch_failures_are_classified_by_text() {
        let refused = "Transport error: error trying to connect: tcp connect error: Connection refused";
        assert_eq!(classify_fetch_failure(refused), FailureType::Expected);
        assert_eq!(classify_fetch_failure("HTTP error: 500"), FailureType::Unexpected);
        assert_eq!(
            classify_fetch_failure("Site missing from payload: mangla"),
            FailureType::Unexpected
        );
        assert_eq!(classify_fetch_failure("Transport error: timed out"), FailureType::Unknown);
    }

    #[test]
    fn test_record_formats() {
        let record = LogRecord {
            at: Utc.with_ymd_and_hms(2025, 12, 5, 13, 0, 0).unwrap(),
            level: LogLevel::Warning,
            source: DataSource::Upstream,
            site_id: Some("tarbela"),
            message: "late",
        };
        assert_eq!(record.to_string(), "2025-12-05 13:00:00 UTC WARN UPSTREAM [tarbela]: late");
        assert_eq!(record.compact(), "   ⚠ UPSTREAM [tarbela]: late");
    }

    #[test]
    fn test_format_entry_without_site() {
        let line = format_entry(LogLevel::Info, &DataSource::System, None, "up");
        assert!(line.ends_with("INFO SYS: up"), "got {}", line);
    }
}
