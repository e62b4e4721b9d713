//! Core Settings struct and implementations.

use super::{BundleSettings, PackageSettings};
use crate::bundler::platform::PackageType;
use std::path::{Path, PathBuf};

/// Main settings for bundler operations.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder).
///
/// # Examples
///
/// ```no_run
/// use macbundler::bundler::{BundleSettings, SettingsBuilder};
///
/// # fn example() -> macbundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .executable("target/release/myapp")
///     .version("2.0")
///     .bundle_settings(BundleSettings {
///         identifier: Some("com.example".into()),
///         ..Default::default()
///     })
///     .build()?;
/// assert_eq!(settings.bundle_identifier(), "com.example.myapp");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    package: PackageSettings,
    bundle_settings: BundleSettings,

    /// Executable placed in `Contents/MacOS`.
    executable: PathBuf,

    /// None means the bundle only.
    package_types: Option<Vec<PackageType>>,

    dry_run: bool,
    interactive: bool,

    /// Ad-hoc sign bundled libraries.
    codesign: bool,
}

impl Settings {
    pub fn product_name(&self) -> &str {
        &self.package.product_name
    }

    pub fn version_string(&self) -> &str {
        &self.package.version
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn bundle_settings(&self) -> &BundleSettings {
        &self.bundle_settings
    }

    pub fn package_types(&self) -> Option<&[PackageType]> {
        self.package_types.as_deref()
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn codesign(&self) -> bool {
        self.codesign
    }

    /// `CFBundleIdentifier`: the identifier prefix followed by the product name.
    pub fn bundle_identifier(&self) -> String {
        format!(
            "{}.{}",
            self.bundle_settings.identifier(),
            self.product_name()
        )
    }

    /// Where the bundle folder is created.
    ///
    /// `<output_dir>/<name><ext>` when an output directory is configured,
    /// otherwise next to the executable.
    pub fn bundle_path(&self) -> PathBuf {
        let name = format!(
            "{}{}",
            self.product_name(),
            self.bundle_settings.extension()
        );
        match &self.bundle_settings.output_dir {
            Some(dir) => dir.join(name),
            None => self
                .executable
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(name),
        }
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    pub(super) fn new(
        package: PackageSettings,
        bundle_settings: BundleSettings,
        executable: PathBuf,
        package_types: Option<Vec<PackageType>>,
        dry_run: bool,
        interactive: bool,
        codesign: bool,
    ) -> Self {
        Self {
            package,
            bundle_settings,
            executable,
            package_types,
            dry_run,
            interactive,
            codesign,
        }
    }
}
