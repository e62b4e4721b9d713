//! Copying libraries into the bundle and rewriting load commands.

use super::{Dependency, DylibBundler};
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    utils::fs::{ValidationOptions, make_writable, prepare_destination, validate_file},
};
use std::path::{Path, PathBuf};

/// How far a library got through the rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    Discovered,
    Installed,
    Signed,
}

/// What the rewrite phase did.
#[derive(Debug, Clone, Default)]
pub struct RewriteSummary {
    /// Installed copies with their final state, in processing order.
    pub installed: Vec<(PathBuf, DependencyState)>,
    /// Targets that were fixed in place.
    pub fixed: Vec<PathBuf>,
}

impl DylibBundler {
    /// Copies every collected library into the destination directory and
    /// rewrites it, then rewrites the targets in place.
    ///
    /// Libraries are processed in reverse discovery order. In dry-run mode the
    /// plan is logged and nothing is touched.
    pub fn process_collected_deps(&self) -> Result<RewriteSummary> {
        for dep in &self.deps {
            log::info!("{}", dep);
        }

        if self.settings.dry_run {
            self.log_plan();
            return Ok(RewriteSummary {
                installed: self
                    .deps
                    .iter()
                    .rev()
                    .map(|dep| (dep.install_path(&self.settings.dest_dir), DependencyState::Discovered))
                    .collect(),
                fixed: Vec::new(),
            });
        }

        prepare_destination(
            &self.settings.dest_dir,
            self.settings.overwrite_dir,
            self.settings.create_dir,
        )?;

        let mut summary = RewriteSummary::default();
        for dep in self.deps.iter().rev() {
            summary.installed.push(self.install_dependency(dep)?);
        }

        for file in self.files_to_fix.iter().rev() {
            log::info!("* Processing {}", file.display());
            self.change_lib_paths(file, file)?;
            self.fix_rpaths(file, file)?;
            self.adhoc_codesign(file)?;
            summary.fixed.push(file.clone());
        }

        Ok(summary)
    }

    fn log_plan(&self) {
        log::info!(
            "[DRY RUN] Would create destination directory: {}",
            self.settings.dest_dir.display()
        );
        for dep in self.deps.iter().rev() {
            log::info!(
                "[DRY RUN] Would copy {} to {}",
                dep.original_path().display(),
                dep.install_path(&self.settings.dest_dir).display()
            );
        }
        for file in self.files_to_fix.iter().rev() {
            log::info!("[DRY RUN] Would fix library paths in {}", file.display());
        }
    }

    fn install_dependency(&self, dep: &Dependency) -> Result<(PathBuf, DependencyState)> {
        let source = dep.original_path();
        let installed = dep.install_path(&self.settings.dest_dir);
        log::info!("* Processing dependency {}", installed.display());

        let options = ValidationOptions {
            check_macho: self.settings.validate_macho,
            ..ValidationOptions::library()
        };
        validate_file(&source, &options)?;

        log::debug!("Copying {} to {}", source.display(), installed.display());
        std::fs::copy(&source, &installed).fs_context("failed to copy library", &source)?;
        make_writable(&installed)?;

        self.toolchain
            .change_install_id(&installed, &dep.inner_path(&self.inner_prefix))?;
        self.change_lib_paths(&installed, &source)?;
        self.fix_rpaths(&installed, &source)?;

        let state = if self.adhoc_codesign(&installed)? {
            DependencyState::Signed
        } else {
            DependencyState::Installed
        };
        Ok((installed, state))
    }

    /// Points every direct dependency of `source` at its bundled copy, editing `target`.
    fn change_lib_paths(&self, target: &Path, source: &Path) -> Result<()> {
        log::info!("Fixing dependencies on {}", target.display());
        let Some(indices) = self.deps_per_file.get(source) else {
            return Ok(());
        };

        for &idx in indices {
            let dep = &self.deps[idx];
            let inner = dep.inner_path(&self.inner_prefix);
            for reference in dep.references() {
                self.toolchain.change_dependency(target, &reference, &inner)?;
            }
        }
        Ok(())
    }

    /// Replaces the run paths declared by `source` with the inner prefix, editing `target`.
    ///
    /// A binary may carry each run path only once, so after the first
    /// replacement the remaining entries are deleted.
    fn fix_rpaths(&self, target: &Path, source: &Path) -> Result<()> {
        let rpaths = self.resolver.rpaths_for(source);
        let mut has_inner = rpaths.iter().any(|r| *r == self.inner_prefix);

        for rpath in rpaths.iter().filter(|r| **r != self.inner_prefix) {
            if has_inner {
                self.toolchain.delete_rpath(target, rpath)?;
            } else {
                self.toolchain
                    .change_rpath(target, rpath, &self.inner_prefix)?;
                has_inner = true;
            }
        }
        Ok(())
    }

    /// Ad-hoc signs `file`. Returns `false` if signing is disabled or a
    /// non-fatal retry failure was tolerated.
    fn adhoc_codesign(&self, file: &Path) -> Result<bool> {
        if !self.settings.codesign {
            return Ok(false);
        }

        log::info!("codesign {}", file.display());
        let Err(first) = self.toolchain.codesign_adhoc(file) else {
            return Ok(true);
        };

        log::error!(
            "An error occurred while applying ad-hoc signature to {}: {}. Attempting workaround",
            file.display(),
            first
        );

        let fatal = self
            .settings
            .signing_retry
            .is_fatal(self.toolchain.host_is_arm());
        let retried = replace_with_copy(file).and_then(|()| self.toolchain.codesign_adhoc(file));

        match retried {
            Ok(()) => Ok(true),
            Err(e) if fatal => Err(Error::SigningFailed {
                path: file.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(e) => {
                log::error!(
                    "An error occurred while applying ad-hoc signature to {}: {}",
                    file.display(),
                    e
                );
                Ok(false)
            }
        }
    }
}

/// Replaces `file` with a fresh copy of itself.
///
/// codesign sometimes refuses a file it has just failed on; a new inode clears it.
fn replace_with_copy(file: &Path) -> Result<()> {
    let temp_dir = tempfile::Builder::new()
        .prefix("macbundler.")
        .tempdir()
        .fs_context("failed to create temporary directory", std::env::temp_dir())?;
    let name = file.file_name().unwrap_or(file.as_os_str());
    let temp_file = temp_dir.path().join(name);

    std::fs::copy(file, &temp_file).fs_context("failed to copy", file)?;
    std::fs::remove_file(file).fs_context("failed to remove", file)?;
    std::fs::copy(&temp_file, file).fs_context("failed to restore", file)?;
    Ok(())
}
