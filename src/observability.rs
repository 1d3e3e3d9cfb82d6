//! Leveled logging sinks.
//!
//! Every pipeline stage reports through a [`LogSink`] carried by the
//! [`crate::context::PipelineContext`]; nothing logs through process-wide state.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::OnboardingError;

/// Severity of a log message. Also used to classify failures for alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O, missing input, or an unreachable store).
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Sink accepting leveled messages.
///
/// Implementors can forward to a logging framework, a file, or a test recorder.
pub trait LogSink: Send + Sync {
    /// Record one message.
    fn log(&self, level: LogLevel, message: &str);

    /// Shorthand for [`LogLevel::Info`].
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message)
    }

    /// Shorthand for [`LogLevel::Warning`].
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, message)
    }

    /// Shorthand for [`LogLevel::Error`].
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message)
    }
}

/// Classify a failure for logging and alerting.
///
/// Infrastructure failures (I/O, missing input, unreachable store) are `Critical`; data and
/// configuration failures are `Error`.
pub fn severity_for_error(e: &OnboardingError) -> LogLevel {
    match e {
        OnboardingError::Io(_)
        | OnboardingError::NotFound { .. }
        | OnboardingError::Connection { .. } => LogLevel::Critical,
        OnboardingError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => LogLevel::Critical,
            _ => LogLevel::Error,
        },
        OnboardingError::Json(err) if err.is_io() => LogLevel::Critical,
        _ => LogLevel::Error,
    }
}

/// Discards every message.
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Writes messages to stderr.
#[derive(Debug, Default)]
pub struct StdErrSink;

impl LogSink for StdErrSink {
    fn log(&self, level: LogLevel, message: &str) {
        eprintln!("[onboard][{level}] {message}");
    }
}

/// Forwards messages to the `tracing` macros at the matching level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "data_onboarding", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "data_onboarding", "{message}"),
            LogLevel::Error | LogLevel::Critical => {
                tracing::error!(target: "data_onboarding", severity = %level, "{message}")
            }
        }
    }
}

/// Appends timestamped messages to a local log file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    /// Create a file sink that appends to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn log(&self, level: LogLevel, message: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(f, "{ts} - {level} - {message}");
        }
    }
}

/// A sink that fans out messages to a list of sinks.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl CompositeSink {
    /// Create a new composite sink from a list of sinks.
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl fmt::Debug for CompositeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSink")
            .field("sinks_len", &self.sinks.len())
            .finish()
    }
}

impl LogSink for CompositeSink {
    fn log(&self, level: LogLevel, message: &str) {
        for s in &self.sinks {
            s.log(level, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{severity_for_error, CompositeSink, FileSink, LogLevel, LogSink, TracingSink};
    use crate::error::OnboardingError;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(LogLevel, String)>>);

    impl LogSink for Recorder {
        fn log(&self, level: LogLevel, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[test]
    fn composite_fans_out_to_every_sink() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let sink = CompositeSink::new(vec![a.clone(), b.clone(), Arc::new(TracingSink)]);

        sink.warn("3 duplicated lines");

        let expected = vec![(LogLevel::Warning, "3 duplicated lines".to_string())];
        assert_eq!(*a.0.lock().unwrap(), expected);
        assert_eq!(*b.0.lock().unwrap(), expected);
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("run.log"));
        sink.info("first");
        sink.error("second");

        let text = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO - first"));
        assert!(lines[1].ends_with("ERROR - second"));
    }

    #[test]
    fn severity_classifies_infrastructure_failures_as_critical() {
        let not_found = OnboardingError::NotFound {
            path: "missing.csv".into(),
        };
        let mismatch = OnboardingError::CountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(severity_for_error(&not_found), LogLevel::Critical);
        assert_eq!(severity_for_error(&mismatch), LogLevel::Error);
        assert!(LogLevel::Critical > LogLevel::Warning);
    }
}
