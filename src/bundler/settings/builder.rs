//! Builder for constructing Settings.

use super::{BundleSettings, PackageSettings, Settings, package::DEFAULT_VERSION};
use crate::bundler::platform::PackageType;
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
///
/// Only the executable is required. The product name defaults to its file
/// stem.
///
/// # See Also
///
/// - [`Settings`] - The built settings struct
pub struct SettingsBuilder {
    executable: Option<PathBuf>,
    product_name: Option<String>,
    version: Option<String>,
    bundle_settings: BundleSettings,
    package_types: Option<Vec<PackageType>>,
    dry_run: bool,
    interactive: bool,
    codesign: bool,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            executable: None,
            product_name: None,
            version: None,
            bundle_settings: BundleSettings::default(),
            package_types: None,
            dry_run: false,
            interactive: true,
            codesign: true,
        }
    }
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the executable to bundle.
    ///
    /// # Required
    ///
    /// This field is required for building.
    pub fn executable<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.executable = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the product name.
    ///
    /// Default: the executable's file stem
    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    /// Default: "1.0"
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets bundle configuration.
    ///
    /// Default: Empty [`BundleSettings`]
    pub fn bundle_settings(mut self, settings: BundleSettings) -> Self {
        self.bundle_settings = settings;
        self
    }

    /// Sets the package types to create.
    ///
    /// Default: None (the application bundle only)
    pub fn package_types(mut self, types: Vec<PackageType>) -> Self {
        self.package_types = Some(types);
        self
    }

    /// Default: false
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Prompt for libraries that cannot be found.
    ///
    /// Default: true
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Ad-hoc sign bundled libraries.
    ///
    /// Default: true
    pub fn codesign(mut self, codesign: bool) -> Self {
        self.codesign = codesign;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable is missing or has no file name.
    pub fn build(self) -> crate::bundler::Result<Settings> {
        use crate::bundler::error::Context;

        let executable = self.executable.context("executable is required")?;
        let product_name = match self.product_name {
            Some(name) => name,
            None => executable
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("executable has no file name")?,
        };

        Ok(Settings::new(
            PackageSettings {
                product_name,
                version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            },
            self.bundle_settings,
            executable,
            self.package_types,
            self.dry_run,
            self.interactive,
            self.codesign,
        ))
    }
}
