//! Main bundler orchestration and coordination.
//!
//! This module provides the [`Bundler`] orchestrator that drives bundle
//! creation and packaging, plus entry points for the standalone dependency
//! fixing, signing and packaging workflows.

use crate::{
    bail,
    bundler::{
        BundledArtifact, Error, PackageType, Result, Settings,
        error::ErrorExt,
        platform::macos::{
            app,
            dmg::{self, Packager},
            dylib::{BundleReport, DylibBundler},
            sign::Codesigner,
        },
        settings::{DmgSettings, DylibSettings, MacOsSettings},
    },
};
use std::path::{Path, PathBuf};

use super::{checksum::calculate_sha256, tool_detection::require_fix_tools};

/// Main bundler orchestrator.
///
/// # Examples
///
/// ```no_run
/// use macbundler::bundler::{Bundler, PackageType, SettingsBuilder};
///
/// # async fn example() -> macbundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .executable("target/release/myapp")
///     .package_types(vec![PackageType::MacOsBundle, PackageType::Dmg])
///     .build()?;
///
/// let artifacts = Bundler::new(settings).bundle().await?;
/// for artifact in artifacts {
///     println!("Created: {} ({} bytes)", artifact.package_type, artifact.size);
///     println!("SHA256: {}", artifact.checksum);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler {
    settings: Settings,
}

impl Bundler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Creates the package types from [`Settings::package_types()`], or just
    /// the `.app` bundle when none are set.
    pub async fn bundle(&self) -> Result<Vec<BundledArtifact>> {
        let package_types = self.determine_package_types();
        self.bundle_types(&package_types).await
    }

    /// Creates the given package types in order.
    ///
    /// A DMG reuses the bundle created earlier in the same run, or creates it.
    pub async fn bundle_types(&self, types: &[PackageType]) -> Result<Vec<BundledArtifact>> {
        let mut artifacts = Vec::new();

        for package_type in types {
            let paths = match package_type {
                PackageType::MacOsBundle => app::bundle_project(&self.settings).await?,
                PackageType::Dmg => dmg::bundle_project(&self.settings).await?,
            };

            let Some(first_path) = paths.first() else {
                bail!(
                    "Platform bundler for {:?} returned no paths - this indicates a bundler bug",
                    package_type
                );
            };

            let (size, checksum) = if self.settings.dry_run() {
                (0, String::new())
            } else {
                let mut size = 0u64;
                for p in &paths {
                    size += artifact_size(p)?;
                }
                (size, calculate_sha256(first_path).await?)
            };

            artifacts.push(BundledArtifact {
                package_type: *package_type,
                paths,
                size,
                checksum,
            });
        }

        Ok(artifacts)
    }

    /// Returns a reference to the bundler settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn determine_package_types(&self) -> Vec<PackageType> {
        match self.settings.package_types() {
            Some(types) => types.to_vec(),
            None => vec![PackageType::MacOsBundle],
        }
    }

    /// Bundles the dependencies of `settings.files_to_fix` into
    /// `settings.dest_dir`.
    ///
    /// Checks that the Xcode tools are installed unless dry-running, then runs
    /// the blocking engine on the blocking thread pool.
    pub async fn fix(settings: DylibSettings) -> Result<BundleReport> {
        if !settings.dry_run {
            require_fix_tools(settings.codesign)?;
        }
        tokio::task::spawn_blocking(move || DylibBundler::new(settings)?.run())
            .await
            .map_err(|e| Error::GenericError(format!("dependency bundling task failed: {e}")))?
    }

    /// Recursively signs an existing bundle.
    pub async fn sign(bundle: &Path, macos: &MacOsSettings, dry_run: bool) -> Result<()> {
        if !bundle.exists() {
            return Err(Error::FileError(format!(
                "Bundle does not exist: {}",
                bundle.display()
            )));
        }
        Codesigner::new(bundle, macos, dry_run)?.process().await
    }

    /// Packages `source` into a signed, notarized DMG.
    pub async fn package(
        source: &Path,
        dmg: &DmgSettings,
        macos: &MacOsSettings,
        dry_run: bool,
    ) -> Result<BundledArtifact> {
        let output = Packager::new(source, dmg, macos, dry_run)?.process().await?;
        let (size, checksum) = if dry_run {
            (0, String::new())
        } else {
            (artifact_size(&output)?, calculate_sha256(&output).await?)
        };
        Ok(BundledArtifact {
            package_type: PackageType::Dmg,
            paths: vec![output],
            size,
            checksum,
        })
    }
}

/// Size of a file, or the total size of the files in a directory.
fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path).fs_context("reading artifact metadata", path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut size = 0;
    for entry in walkdir::WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| Error::FileError(e.to_string()))?;
        if entry.file_type().is_file() {
            let file: PathBuf = entry.path().to_path_buf();
            size += entry
                .metadata()
                .map_err(|e| Error::FileError(format!("{}: {}", file.display(), e)))?
                .len();
        }
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::SettingsBuilder;

    #[test]
    fn defaults_to_app_bundle_only() {
        let settings = SettingsBuilder::new().executable("/b/app").build().unwrap();
        assert_eq!(
            Bundler::new(settings).determine_package_types(),
            vec![PackageType::MacOsBundle]
        );
    }

    #[test]
    fn directory_size_sums_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one"), [0u8; 10]).unwrap();
        std::fs::write(dir.path().join("a/b/two"), [0u8; 5]).unwrap();
        assert_eq!(artifact_size(dir.path()).unwrap(), 15);
        assert_eq!(artifact_size(&dir.path().join("a/one")).unwrap(), 10);
    }

    #[tokio::test]
    async fn dry_run_fix_skips_tool_check() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DylibSettings {
            dry_run: true,
            interactive: false,
            ..DylibSettings::new(dir.path().join("libs"), vec![dir.path().join("missing")])
        };
        let err = Bundler::fix(settings).await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[tokio::test]
    async fn dry_run_bundle_reports_planned_paths() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("tool");
        std::fs::write(&exe, b"\xcf\xfa\xed\xfe\x07\x00\x00\x01").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let settings = SettingsBuilder::new()
            .executable(&exe)
            .version("3.0")
            .package_types(vec![PackageType::MacOsBundle, PackageType::Dmg])
            .dry_run(true)
            .build()
            .unwrap();

        let artifacts = Bundler::new(settings).bundle().await.unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].paths, vec![dir.path().join("tool.app")]);
        assert_eq!(artifacts[1].paths, vec![dir.path().join("tool-3.0.dmg")]);
        assert!(!dir.path().join("tool.app").exists());
    }

    #[tokio::test]
    async fn signing_missing_bundle_fails() {
        let err = Bundler::sign(Path::new("/nonexistent/X.app"), &MacOsSettings::default(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FileError(_)));
    }
}
