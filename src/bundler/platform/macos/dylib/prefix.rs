//! Decides which library locations are bundled and which are left alone.

use std::path::{Path, PathBuf};

/// Locations that ship with the operating system.
pub const DEFAULT_SYSTEM_PREFIXES: &[&str] = &["/usr/lib/", "/System/Library/"];

/// Appends a trailing `/` so prefix comparison works on whole components.
fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Exclusion rules applied to every library location.
#[derive(Debug, Clone)]
pub struct PrefixFilter {
    system_prefixes: Vec<String>,
    ignored: Vec<PathBuf>,
    inner_prefix: Option<String>,
}

impl Default for PrefixFilter {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PREFIXES.iter().map(|p| p.to_string()).collect())
    }
}

impl PrefixFilter {
    /// Creates a filter treating `system_prefixes` as operating system locations.
    pub fn new(system_prefixes: Vec<String>) -> Self {
        Self {
            system_prefixes: system_prefixes
                .iter()
                .map(|p| with_trailing_slash(p))
                .collect(),
            ignored: Vec::new(),
            inner_prefix: None,
        }
    }

    /// Treats references under `prefix` as already bundled.
    pub fn set_inner_prefix(&mut self, prefix: &str) {
        self.inner_prefix = Some(with_trailing_slash(prefix));
    }

    fn is_inner_prefix(&self, prefix: &str) -> bool {
        self.inner_prefix
            .as_deref()
            .is_some_and(|inner| with_trailing_slash(prefix).starts_with(inner))
    }

    /// Leaves libraries under `prefix` where they are.
    pub fn ignore_prefix(&mut self, prefix: impl Into<PathBuf>) {
        let prefix = prefix.into();
        if !self.ignored.contains(&prefix) {
            self.ignored.push(prefix);
        }
    }

    pub fn ignored_prefixes(&self) -> &[PathBuf] {
        &self.ignored
    }

    pub fn is_system_library(&self, path: &str) -> bool {
        let path = with_trailing_slash(path);
        self.system_prefixes.iter().any(|p| path.starts_with(p))
    }

    pub fn is_ignored_prefix(&self, prefix: &Path) -> bool {
        self.ignored.iter().any(|i| prefix.starts_with(i))
    }

    /// Returns `true` if libraries living in `prefix` should be copied into the bundle.
    ///
    /// Frameworks, already bundled `@executable_path` or inner prefix
    /// references, system locations and ignored prefixes are all excluded.
    pub fn is_bundled_prefix(&self, prefix: &str) -> bool {
        if prefix.contains(".framework") || prefix.contains("@executable_path") {
            return false;
        }
        if self.is_inner_prefix(prefix) {
            return false;
        }
        if self.is_system_library(prefix) {
            return false;
        }
        !self.is_ignored_prefix(Path::new(prefix))
    }
}
