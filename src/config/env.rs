//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `.env` from the working directory if present. Already-set variables win.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        dotenv::from_path(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok(true)
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "PERF_TEST_USER" => {
                if value.trim().is_empty() || value.contains(char::is_whitespace) {
                    return Err(AppError::config(format!(
                        "Invalid PERF_TEST_USER value '{}'",
                        value
                    )));
                }
            }
            "PERF_TEST_MIN_PORT" | "PERF_TEST_MAX_PORT" | "PERF_TEST_SSH_PORT" => {
                let port: u16 = value.trim().parse().map_err(|e| {
                    AppError::config(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
                if port == 0 {
                    return Err(AppError::config(format!("{} must be between 1 and 65535", key)));
                }
            }
            "PERF_TEST_SETTLE_SECS" => {
                let secs: u64 = value.trim().parse().map_err(|e| {
                    AppError::config(format!(
                        "Invalid PERF_TEST_SETTLE_SECS value '{}': {}",
                        value, e
                    ))
                })?;
                if secs > 300 {
                    return Err(AppError::config(format!(
                        "PERF_TEST_SETTLE_SECS must be at most 300, got: {}",
                        secs
                    )));
                }
            }
            // PERF_TEST_PASS is opaque
            _ => {}
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("PERF_TEST_USER", "SSH login user", "metaxadmin"),
            ("PERF_TEST_PASS", "SSH password, passed to sshpass (optional)", "********"),
            ("PERF_TEST_MIN_PORT", "Lowest benchmark port", "35000"),
            ("PERF_TEST_MAX_PORT", "Highest benchmark port", "45000"),
            ("PERF_TEST_SSH_PORT", "SSH port on every node", "22"),
            ("PERF_TEST_SETTLE_SECS", "Seconds to wait between phases (0-300)", "5"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(name, _, _)| {
                let value = std::env::var(name).ok()?;
                Self::validate_env_var(name, &value).err()
            })
            .map(|e| format!("Warning: {}", e))
            .collect()
    }
}
