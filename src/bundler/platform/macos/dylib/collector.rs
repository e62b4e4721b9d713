//! Dependency discovery and closure expansion.

use super::{Dependency, DylibBundler, otool::parse_load_commands};
use crate::bundler::error::{Error, Result};
use std::path::Path;

impl DylibBundler {
    /// Records the run paths and direct dependencies of `file`.
    ///
    /// Each file is read at most once per run.
    pub fn collect_dependencies(&mut self, file: &Path) -> Result<()> {
        if self.collected.contains(file) {
            return Ok(());
        }
        if !file.exists() {
            return Err(Error::FileNotFound(file.to_path_buf()));
        }

        log::debug!("Collecting dependencies of {}", file.display());
        let output = self.toolchain.load_commands(file)?;
        let commands = parse_load_commands(file, &output)?;
        self.resolver.record_rpaths(file, commands.rpaths);

        let mut direct = Vec::new();
        for reference in &commands.dylibs {
            if let Some(idx) = self.add_dependency(reference, file)? {
                if !direct.contains(&idx) {
                    direct.push(idx);
                }
            }
        }

        self.deps_per_file.insert(file.to_path_buf(), direct);
        self.collected.insert(file.to_path_buf());
        Ok(())
    }

    /// Resolves one reference and merges it into the discovery set.
    ///
    /// Returns the index of the record, or `None` if the library stays where it is.
    fn add_dependency(&mut self, reference: &str, file: &Path) -> Result<Option<usize>> {
        if reference.contains(".framework") || self.filter.is_system_library(reference) {
            log::debug!("Skipping {}", reference);
            return Ok(None);
        }

        let declared_prefix = Path::new(reference)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.filter.is_bundled_prefix(&declared_prefix) {
            log::debug!("Skipping {}", reference);
            return Ok(None);
        }

        let real = self.resolver.resolve(reference, file)?;
        let real_prefix = real
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !self.filter.is_bundled_prefix(&real_prefix) {
            log::debug!("Skipping {} (resolves to {})", reference, real.display());
            return Ok(None);
        }

        let mut dep = Dependency::new(&real)?;
        if real.to_string_lossy() != reference {
            dep.add_alias(reference);
        }

        if let Some(idx) = self
            .deps
            .iter()
            .position(|known| known.filename() == dep.filename())
        {
            self.deps[idx].merge_if_same(&dep);
            return Ok(Some(idx));
        }

        self.deps.push(dep);
        Ok(Some(self.deps.len() - 1))
    }

    /// Collects the dependencies of every discovered library until a pass
    /// finds nothing new. Returns the number of passes that did work.
    pub fn collect_sub_dependencies(&mut self) -> Result<usize> {
        let mut passes = 0;

        loop {
            let known = self.deps.len();
            if known == 0 {
                break;
            }
            passes += 1;

            for idx in 0..known {
                let original = self.deps[idx].original_path();
                self.collect_dependencies(&original)?;
            }

            if self.deps.len() == known {
                break;
            }
        }

        log::info!(
            "Collected {} dependencies in {} passes",
            self.deps.len(),
            passes
        );
        Ok(passes)
    }
}
