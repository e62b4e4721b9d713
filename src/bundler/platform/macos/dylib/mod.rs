//! Dynamic library dependency bundling.
//!
//! Copies every non-system library an executable depends on into a
//! destination directory and rewrites load commands so the executable and
//! the copies find each other through `@executable_path`-relative references.
//!
//! # Process
//!
//! 1. [`DylibBundler::collect_dependencies`] reads the load commands of each
//!    target and resolves its direct dependencies
//! 2. [`DylibBundler::collect_sub_dependencies`] expands the closure until a
//!    pass discovers nothing new
//! 3. [`DylibBundler::process_collected_deps`] copies each library, rewrites
//!    its install name, dependencies and run paths, then ad-hoc signs it, and
//!    finally fixes the targets in place
//!
//! Everything is read before anything is written. The rewrite phase only
//! borrows the collected state.

mod collector;
mod dependency;
pub mod otool;
mod prefix;
pub mod resolver;
mod rewriter;
pub mod toolchain;

#[cfg(test)]
mod testing;

pub use dependency::Dependency;
pub use prefix::{DEFAULT_SYSTEM_PREFIXES, PrefixFilter};
pub use resolver::{InteractivePrompt, NonInteractive, PathResolver, UnresolvedHandler};
pub use rewriter::{DependencyState, RewriteSummary};
pub use toolchain::{SystemToolchain, Toolchain};

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::DylibSettings,
};
use path_absolutize::Absolutize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Outcome of a complete bundling run.
#[derive(Debug, Clone, Default)]
pub struct BundleReport {
    /// Every library in discovery order.
    pub dependencies: Vec<Dependency>,
    /// Closure expansion passes until the fixed point.
    pub passes: usize,
    pub rewrite: RewriteSummary,
}

/// State of one bundling run.
pub struct DylibBundler {
    settings: DylibSettings,
    inner_prefix: String,
    toolchain: Box<dyn Toolchain + Send>,
    resolver: PathResolver,
    filter: PrefixFilter,
    deps: Vec<Dependency>,
    deps_per_file: HashMap<PathBuf, Vec<usize>>,
    collected: HashSet<PathBuf>,
    files_to_fix: Vec<PathBuf>,
}

impl std::fmt::Debug for DylibBundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibBundler")
            .field("dest_dir", &self.settings.dest_dir)
            .field("files_to_fix", &self.files_to_fix)
            .field("dependencies", &self.deps.len())
            .finish_non_exhaustive()
    }
}

impl DylibBundler {
    /// Creates a bundler using the Xcode command line tools.
    ///
    /// Unresolved libraries are asked for on the terminal when
    /// `settings.interactive` is set, otherwise they abort the run.
    pub fn new(settings: DylibSettings) -> Result<Self> {
        let handler: Box<dyn UnresolvedHandler + Send> = if settings.interactive {
            Box::new(InteractivePrompt::stdio())
        } else {
            Box::new(NonInteractive)
        };
        Self::with_toolchain(settings, Box::new(SystemToolchain), handler)
    }

    /// Creates a bundler with an explicit toolchain and unresolved-library handler.
    pub fn with_toolchain(
        settings: DylibSettings,
        toolchain: Box<dyn Toolchain + Send>,
        handler: Box<dyn UnresolvedHandler + Send>,
    ) -> Result<Self> {
        if settings.files_to_fix.is_empty() {
            return Err(Error::ConfigurationError("no files to fix specified".into()));
        }
        if settings.dest_dir.as_os_str().is_empty() {
            return Err(Error::ConfigurationError(
                "no destination directory specified".into(),
            ));
        }

        let mut filter = PrefixFilter::new(settings.system_prefixes.clone());
        for prefix in &settings.prefixes_to_ignore {
            filter.ignore_prefix(prefix.clone());
        }
        filter.set_inner_prefix(&settings.inner_prefix());

        let mut resolver = PathResolver::new(handler);
        for path in &settings.search_paths {
            resolver.add_search_path(path.clone());
        }

        let mut bundler = Self {
            inner_prefix: settings.inner_prefix(),
            files_to_fix: Vec::new(),
            settings,
            toolchain,
            resolver,
            filter,
            deps: Vec::new(),
            deps_per_file: HashMap::new(),
            collected: HashSet::new(),
        };
        for file in bundler.settings.files_to_fix.clone() {
            bundler.add_file_to_fix(&file)?;
        }
        Ok(bundler)
    }

    /// Adds another target. The first target's directory is what
    /// `@executable_path` expands to during resolution.
    pub fn add_file_to_fix(&mut self, file: &Path) -> Result<()> {
        let file = file
            .absolutize()
            .fs_context("failed to resolve path", file)?
            .into_owned();
        if self.files_to_fix.is_empty() {
            if let Some(dir) = file.parent() {
                self.resolver.set_executable_dir(dir);
            }
        }
        if !self.files_to_fix.contains(&file) {
            self.files_to_fix.push(file);
        }
        Ok(())
    }

    pub fn ignore_prefix(&mut self, prefix: impl Into<PathBuf>) {
        self.filter.ignore_prefix(prefix);
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.resolver.add_search_path(path);
    }

    pub fn is_system_library(&self, path: &str) -> bool {
        self.filter.is_system_library(path)
    }

    pub fn is_bundled_prefix(&self, prefix: &str) -> bool {
        self.filter.is_bundled_prefix(prefix)
    }

    pub fn settings(&self) -> &DylibSettings {
        &self.settings
    }

    pub fn files_to_fix(&self) -> &[PathBuf] {
        &self.files_to_fix
    }

    /// Libraries discovered so far, in discovery order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.deps
    }

    /// Direct dependencies of `file`, if it has been collected.
    pub fn dependencies_of(&self, file: &Path) -> Option<Vec<&Dependency>> {
        self.deps_per_file
            .get(file)
            .map(|indices| indices.iter().map(|&i| &self.deps[i]).collect())
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Collects the full closure of every target, then copies and rewrites.
    pub fn run(&mut self) -> Result<BundleReport> {
        log::info!("Collecting dependencies");
        for file in self.files_to_fix.clone() {
            self.collect_dependencies(&file)?;
        }
        let passes = self.collect_sub_dependencies()?;
        let rewrite = self.process_collected_deps()?;

        log::info!("✓ Done");
        Ok(BundleReport {
            dependencies: self.deps.clone(),
            passes,
            rewrite,
        })
    }
}
