//! External tool detection and availability checking.
//!
//! Dependency bundling shells out to the Xcode command line tools. Their
//! availability is checked once with `which` and cached.

use crate::bundler::{Error, Result};
use std::sync::LazyLock;

fn is_installed(tool: &str) -> bool {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            true
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", tool, e);
            false
        }
    }
}

/// Check if otool is available for reading load commands.
pub static HAS_OTOOL: LazyLock<bool> = LazyLock::new(|| is_installed("otool"));

/// Check if install_name_tool is available for rewriting load commands.
pub static HAS_INSTALL_NAME_TOOL: LazyLock<bool> =
    LazyLock::new(|| is_installed("install_name_tool"));

/// Check if codesign is available for signing.
pub static HAS_CODESIGN: LazyLock<bool> = LazyLock::new(|| is_installed("codesign"));

/// Names of the tools a dependency bundling run needs but cannot find.
pub fn missing_fix_tools(codesign: bool) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !*HAS_OTOOL {
        missing.push("otool");
    }
    if !*HAS_INSTALL_NAME_TOOL {
        missing.push("install_name_tool");
    }
    if codesign && !*HAS_CODESIGN {
        missing.push("codesign");
    }
    missing
}

/// Fails with [`Error::ConfigurationError`] naming every missing tool.
pub fn require_fix_tools(codesign: bool) -> Result<()> {
    let missing = missing_fix_tools(codesign);
    if missing.is_empty() {
        return Ok(());
    }
    Err(Error::ConfigurationError(format!(
        "required tools not found in PATH: {}. Install the Xcode command line tools",
        missing.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tools_match_detection() {
        assert_eq!(missing_fix_tools(true).is_empty(), require_fix_tools(true).is_ok());
        if !*HAS_OTOOL {
            let err = require_fix_tools(false).unwrap_err();
            assert!(err.to_string().contains("otool"));
        }
    }
}
