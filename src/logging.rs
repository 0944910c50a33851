//! Queue-backed structured logging
//!
//! Every component logs through a cheap [`Logger`] handle that only owns the
//! sending half of a bounded channel. A single [`LogListener`] thread owns the
//! sinks (console plus a rolling log file) and serializes entries to them in
//! arrival order. Shutdown sends a terminating sentinel and waits until the
//! consumer has drained everything queued before it.

use crate::error::{AppError, Result};
use crate::models::Config;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Unexpected top-level failures
    Critical = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Critical => "\x1b[35m", // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
    /// Component that produced the entry
    pub logger: String,
    pub session_id: Option<String>,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// `timestamp - LEVEL - [logger] message {k=v, ...}`
    pub fn format_text(&self, use_color: bool) -> String {
        let timestamp = self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = if use_color {
            format!("{}{}{}", self.level.color_code(), self.level.as_str(), LogLevel::reset_code())
        } else {
            self.level.as_str().to_string()
        };

        let mut output = format!("{} - {} - [{}] {}", timestamp, level, self.logger, self.message);

        if !self.fields.is_empty() {
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    pub fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                self.message
            )
        })
    }
}

/// File sink output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Sink and queue settings for a [`LogListener`]
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub min_level: LogLevel,
    pub console: bool,
    pub use_color: bool,
    pub file: Option<PathBuf>,
    pub file_format: LogFormat,
    pub rotation: LogRotation,
    /// Log files kept before the oldest is deleted
    pub max_files: usize,
    pub queue_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            console: true,
            use_color: true,
            file: Some(PathBuf::from(crate::defaults::DEFAULT_LOG_FILE)),
            file_format: LogFormat::Text,
            rotation: LogRotation::Daily,
            max_files: 7,
            queue_capacity: 1024,
        }
    }
}

impl LogConfig {
    /// `--verbose` shows per-batch and per-job dispatch lines, `--debug`
    /// additionally every remote command and switches the file to JSON
    pub fn from_config(config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Trace
        } else if config.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        Self {
            min_level,
            use_color: config.enable_color,
            file: Some(config.log_file.clone()),
            file_format: if config.debug { LogFormat::Json } else { LogFormat::Text },
            ..Default::default()
        }
    }
}

enum LogMessage {
    Entry(LogEntry),
    Shutdown,
}

/// Handle used by every component to emit log entries
#[derive(Clone)]
pub struct Logger {
    name: String,
    min_level: LogLevel,
    session_id: Arc<str>,
    sender: mpsc::Sender<LogMessage>,
}

impl Logger {
    /// A handle whose entries go nowhere
    pub fn discard() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self {
            name: "MBT".to_string(),
            min_level: LogLevel::Trace,
            session_id: Arc::from(""),
            sender,
        }
    }

    /// Same queue, different component name
    pub fn named(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn critical(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Critical, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn enqueue(&self, entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }
        // A closed queue means the listener is gone; entries are dropped
        let _ = self.sender.send(LogMessage::Entry(entry)).await;
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        let session_id = if logger.session_id.is_empty() {
            None
        } else {
            Some(logger.session_id.to_string())
        };

        Self {
            logger,
            entry: LogEntry {
                timestamp: Local::now(),
                level,
                message,
                logger: logger.name.clone(),
                session_id,
                fields: BTreeMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
    }

    /// Finalize and queue the log entry
    pub async fn log(self) {
        self.logger.enqueue(self.entry).await;
    }
}

/// Open the rolling file sink for `path`.
///
/// `perftest.log` rotated daily becomes `perftest.2026-01-01.log`; with
/// [`LogRotation::Never`] the file keeps its plain name.
fn open_file_sink(
    path: &Path,
    rotation: LogRotation,
    max_files: usize,
) -> Result<RollingFileAppender> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::config(format!("Invalid log file path: {}", path.display())))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation.into())
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1));
    if let Some(extension) = path.extension() {
        builder = builder.filename_suffix(extension.to_string_lossy().into_owned());
    }

    builder
        .build(&directory)
        .map_err(|e| AppError::setup(format!("Failed to open log file {}: {}", path.display(), e)))
}

/// Everything the consumer thread owns
struct Sinks {
    console: bool,
    use_color: bool,
    file: Option<RollingFileAppender>,
    file_format: LogFormat,
}

impl Sinks {
    fn write(&mut self, entry: &LogEntry) {
        if self.console {
            let line = entry.format_text(self.use_color);
            if entry.level >= LogLevel::Warn {
                let _ = writeln!(io::stderr(), "{}", line);
            } else {
                let _ = writeln!(io::stdout(), "{}", line);
            }
        }

        if let Some(file) = self.file.as_mut() {
            let line = match self.file_format {
                LogFormat::Text => entry.format_text(false),
                LogFormat::Json => entry.format_json(),
            };
            if let Err(e) = file.write_all(format!("{}\n", line).as_bytes()) {
                let _ = writeln!(io::stderr(), "log file write failed: {}", e);
            }
        }
    }

    fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        let _ = io::stdout().flush();
    }
}

/// The single consumer of the log queue
pub struct LogListener {
    sender: mpsc::Sender<LogMessage>,
    handle: JoinHandle<u64>,
}

impl LogListener {
    /// Open the sinks, spawn the consumer thread and hand back a root logger
    pub fn start(config: LogConfig) -> Result<(LogListener, Logger)> {
        let file = match &config.file {
            Some(path) => Some(open_file_sink(path, config.rotation, config.max_files)?),
            None => None,
        };

        let mut sinks = Sinks {
            console: config.console,
            use_color: config.use_color,
            file,
            file_format: config.file_format,
        };

        let (sender, mut receiver) = mpsc::channel(config.queue_capacity.max(1));

        let handle = std::thread::Builder::new()
            .name("log-listener".to_string())
            .spawn(move || {
                let mut written = 0u64;
                while let Some(message) = receiver.blocking_recv() {
                    match message {
                        LogMessage::Entry(entry) => {
                            sinks.write(&entry);
                            written += 1;
                        }
                        LogMessage::Shutdown => break,
                    }
                }
                sinks.flush();
                written
            })
            .map_err(|e| AppError::setup(format!("Failed to spawn log listener: {}", e)))?;

        let logger = Logger {
            name: "MBT".to_string(),
            min_level: config.min_level,
            session_id: Arc::from(Uuid::new_v4().to_string()),
            sender: sender.clone(),
        };

        Ok((LogListener { sender, handle }, logger))
    }

    /// Send the terminating sentinel and wait for the queue to drain.
    ///
    /// Returns the number of entries written by the consumer.
    pub async fn shutdown(self) -> Result<u64> {
        let LogListener { sender, handle } = self;
        // Err only if the consumer already exited, which join reports below
        let _ = sender.send(LogMessage::Shutdown).await;
        drop(sender);

        tokio::task::spawn_blocking(move || handle.join())
            .await
            .map_err(|e| AppError::internal(format!("Log listener join failed: {}", e)))?
            .map_err(|_| AppError::internal("Log listener thread panicked"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn file_config(path: PathBuf) -> LogConfig {
        LogConfig {
            console: false,
            use_color: false,
            file: Some(path),
            rotation: LogRotation::Never,
            ..Default::default()
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("critical").unwrap(), LogLevel::Critical);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_text_format() {
        let mut fields = BTreeMap::new();
        fields.insert("port".to_string(), serde_json::json!(35000));
        let entry = LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Warn,
            message: "Task timeout".to_string(),
            logger: "EXEC".to_string(),
            session_id: None,
            fields,
        };

        let plain = entry.format_text(false);
        assert!(plain.contains(" - WARNING - [EXEC] Task timeout"));
        assert!(plain.ends_with("{port=35000}"));

        let json = entry.format_json();
        assert!(json.starts_with('{'));
        assert!(json.contains("\"Task timeout\""));
    }

    #[tokio::test]
    async fn test_discard_logger_never_blocks() {
        let logger = Logger::discard();
        for i in 0..100 {
            logger.info("dropped").field("i", i).log().await;
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("perftest.log");
        let (listener, logger) = LogListener::start(file_config(path.clone())).unwrap();

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let logger = logger.named(&format!("W{}", worker));
            tasks.push(tokio::spawn(async move {
                for i in 0..25 {
                    logger.info("dispatch").field("i", i).log().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let written = listener.shutdown().await.unwrap();
        assert_eq!(written, 200);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 200);
        assert!(content.contains("[W7] dispatch"));
    }

    #[tokio::test]
    async fn test_min_level_filters_before_queueing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filtered.log");
        let mut config = file_config(path.clone());
        config.min_level = LogLevel::Warn;
        let (listener, logger) = LogListener::start(config).unwrap();

        logger.debug("hidden").log().await;
        logger.info("hidden").log().await;
        logger.warn("shown").log().await;
        logger.critical("shown").log().await;

        assert_eq!(listener.shutdown().await.unwrap(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hidden"));
        assert!(content.contains("CRITICAL"));
    }

    #[tokio::test]
    async fn test_daily_file_sink_is_date_stamped() {
        let dir = TempDir::new().unwrap();
        let mut config = file_config(dir.path().join("roll.log"));
        config.rotation = LogRotation::Daily;
        config.max_files = 2;
        let (listener, logger) = LogListener::start(config).unwrap();

        for i in 0..10 {
            logger.info("dispatch").field("i", i).log().await;
        }
        listener.shutdown().await.unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        // roll.YYYY-MM-DD.log
        assert!(names[0].starts_with("roll."));
        assert!(names[0].ends_with(".log"));
        assert_ne!(names[0], "roll.log");

        let content = fs::read_to_string(dir.path().join(&names[0])).unwrap();
        assert_eq!(content.lines().count(), 10);
    }

    #[tokio::test]
    async fn test_unrotated_file_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("perftest.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        for round in 0..2 {
            let (listener, logger) = LogListener::start(file_config(path.clone())).unwrap();
            logger.info(&format!("round {}", round)).log().await;
            listener.shutdown().await.unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("round 0"));
        assert!(content.contains("round 1"));
    }

    #[tokio::test]
    async fn test_entries_after_shutdown_are_dropped() {
        let dir = TempDir::new().unwrap();
        let (listener, logger) =
            LogListener::start(file_config(dir.path().join("late.log"))).unwrap();
        listener.shutdown().await.unwrap();

        // Must not hang or panic once the consumer is gone
        logger.error("too late").log().await;
    }

    #[test]
    fn test_log_config_from_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };
        let log_config = LogConfig::from_config(&config);
        assert_eq!(log_config.min_level, LogLevel::Trace);
        assert_eq!(log_config.file_format, LogFormat::Json);
        assert!(!log_config.use_color);
    }

    #[test]
    fn test_verbose_lowers_threshold_only() {
        let quiet = LogConfig::from_config(&Config::default());
        assert_eq!(quiet.min_level, LogLevel::Info);

        let verbose = LogConfig::from_config(&Config {
            verbose: true,
            ..Default::default()
        });
        assert_eq!(verbose.min_level, LogLevel::Debug);
        assert_eq!(verbose.file_format, LogFormat::Text);
    }
}
