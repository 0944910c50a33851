//! Error handling for the mesh bandwidth tester

use thiserror::Error;

/// Custom error types for the mesh bandwidth tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (artifact names, numbers, addresses)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Remote command transport errors (ssh/scp)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The shared port pool has no free ports left
    #[error("Port pool exhausted: {0}")]
    PoolExhausted(String),

    /// Result dataset read/write errors
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Local run setup failures (result directory creation)
    #[error("Setup error: {0}")]
    Setup(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new pool exhaustion error
    pub fn pool_exhausted<S: Into<String>>(message: S) -> Self {
        Self::PoolExhausted(message.into())
    }

    /// Create a new dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        Self::Dataset(message.into())
    }

    /// Create a new setup error
    pub fn setup<S: Into<String>>(message: S) -> Self {
        Self::Setup(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Transport(_) => "TRANSPORT",
            Self::Timeout(_) => "TIMEOUT",
            Self::PoolExhausted(_) => "PORTS",
            Self::Dataset(_) => "DATASET",
            Self::Setup(_) => "SETUP",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether this error aborts the whole run.
    ///
    /// Everything raised inside a worker (transport, timeout, pool exhaustion,
    /// artifact parsing) is contained and logged; only local setup and
    /// configuration problems stop the orchestrator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Config(_) | Self::Validation(_))
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Transport(_) => 2,
            Self::Timeout(_) => 3,
            Self::PoolExhausted(_) => 4,
            Self::Io(_) | Self::Dataset(_) => 5,
            Self::Setup(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Transport(_) | Self::PoolExhausted(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) | Self::Dataset(_) | Self::Setup(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(error: csv::Error) -> Self {
        Self::dataset(format!("CSV error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::parse(format!("Float parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        Self::timeout(error.to_string())
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            let context = f();
            match original_error {
                // Keep the variant so fatal classification survives the added context
                AppError::Setup(msg) => AppError::setup(format!("{}: {}", context, msg)),
                AppError::Config(msg) => AppError::config(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(config_error.is_fatal());
        assert_eq!(config_error.exit_code(), 1);

        let transport_error = AppError::transport("Connection refused");
        assert_eq!(transport_error.category(), "TRANSPORT");
        assert!(!transport_error.is_fatal());
        assert_eq!(transport_error.exit_code(), 2);
    }

    #[test]
    fn test_error_display() {
        let error = AppError::pool_exhausted("no ports left in 35000-35001");
        let display = error.to_string();
        assert!(display.contains("Port pool exhausted"));
        assert!(display.contains("35000-35001"));
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::validation("validation"),
            AppError::io("io"),
            AppError::parse("parse"),
            AppError::transport("transport"),
            AppError::timeout("timeout"),
            AppError::pool_exhausted("ports"),
            AppError::dataset("dataset"),
            AppError::setup("setup"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "VALIDATION", "IO", "PARSE", "TRANSPORT",
            "TIMEOUT", "PORTS", "DATASET", "SETUP", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_only_setup_class_errors_are_fatal() {
        assert!(AppError::setup("mkdir failed").is_fatal());
        assert!(AppError::validation("bad range").is_fatal());

        assert!(!AppError::transport("test").is_fatal());
        assert!(!AppError::timeout("test").is_fatal());
        assert!(!AppError::pool_exhausted("test").is_fatal());
        assert!(!AppError::parse("test").is_fatal());
        assert!(!AppError::dataset("test").is_fatal());
        assert!(!AppError::io("test").is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::transport("test").exit_code(), 2);
        assert_eq!(AppError::timeout("test").exit_code(), 3);
        assert_eq!(AppError::pool_exhausted("test").exit_code(), 4);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::setup("test").exit_code(), 6);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<u16>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let float_error = "fast".parse::<f64>().unwrap_err();
        let app_error: AppError = float_error.into();
        assert!(app_error.to_string().contains("Float parse error"));
    }

    #[test]
    fn test_addr_parse_error_conversion() {
        let addr_error = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        let app_error: AppError = addr_error.into();
        assert_eq!(app_error.category(), "PARSE");
        assert!(app_error.to_string().contains("IP address parse error"));
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
    }

    #[test]
    fn test_anyhow_integration() {
        let anyhow_error = anyhow::anyhow!("Test anyhow error");
        let app_error: AppError = anyhow_error.into();
        assert_eq!(app_error.category(), "INTERNAL");

        let app_error = AppError::config("Test config error");
        let anyhow_error = anyhow::anyhow!(app_error);
        assert!(anyhow_error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_context() {
        let result: Result<i32> = Err(AppError::transport("Connection failed"));
        let with_context = result.context("While preparing remote directories");

        let error = with_context.unwrap_err();
        assert_eq!(error.category(), "INTERNAL");
        assert!(error.to_string().contains("While preparing remote directories"));
    }

    #[test]
    fn test_error_context_keeps_setup_fatal() {
        let result: Result<()> = Err(AppError::setup("permission denied"));
        let error = result
            .with_context(|| "Creating result directory".to_string())
            .unwrap_err();

        assert!(error.is_fatal());
        assert!(error.to_string().contains("Creating result directory"));
        assert!(error.to_string().contains("permission denied"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::setup("Test error");
        let formatted_no_color = error.format_for_console(false);
        let formatted_color = error.format_for_console(true);

        assert_eq!(formatted_no_color, "[SETUP] Setup error: Test error");
        assert!(formatted_color.contains("Test error"));
    }
}
