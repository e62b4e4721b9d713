//! Subcommand handlers.
//!
//! Each handler merges its arguments over the configuration file and
//! returns the process exit code. Precedence: flag, environment variable,
//! config file, built-in default.

pub mod create;
pub mod fix;
pub mod package;
pub mod sign;

use super::RuntimeConfig;
use crate::error::{CliError, Result};
use std::path::Path;

/// Reports a missing input path. Returns `true` if the path exists.
fn require_input(runtime: &RuntimeConfig, kind: &'static str, path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(true);
    }
    let error = CliError::InputNotFound {
        kind,
        path: path.to_path_buf(),
    };
    runtime.output().error(&error.to_string())?;
    Ok(false)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
