//! Architecture introspection with `lipo -info`.

use crate::bundler::utils::command::run;
use std::ffi::OsStr;
use std::path::Path;

/// Extracts architecture names from `lipo -info` output.
///
/// Handles both `Architectures in the fat file: X are: x86_64 arm64` and
/// `Non-fat file: X is architecture: arm64`. Anything else yields nothing.
pub fn parse_lipo_info(output: &str) -> Vec<String> {
    let output = output.trim();
    let list = if let Some((_, archs)) = output.rsplit_once("are:") {
        archs
    } else if let Some((_, arch)) = output.rsplit_once("is architecture:") {
        arch
    } else {
        return Vec::new();
    };
    list.split_whitespace().map(str::to_string).collect()
}

/// Architectures contained in `path`. Empty if lipo fails.
pub async fn architectures(path: &Path) -> Vec<String> {
    match run("lipo", &[OsStr::new("-info"), path.as_os_str()], false).await {
        Ok(output) => parse_lipo_info(&output),
        Err(e) => {
            log::debug!("lipo -info failed for {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
