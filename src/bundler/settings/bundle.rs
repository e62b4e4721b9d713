//! Application bundle configuration.

use super::{DmgSettings, MacOsSettings};
use std::path::PathBuf;

/// Default bundle identifier prefix.
pub const DEFAULT_IDENTIFIER: &str = "org.me";

/// Default bundle folder extension.
pub const DEFAULT_EXTENSION: &str = ".app";

/// Bundle scaffolding configuration.
///
/// # Configuration
///
/// Filled from the `[create]` section of `.macbundler.toml`:
///
/// ```toml
/// [create]
/// id = "com.example"
/// extension = ".app"
/// icon = "assets/app.icns"
/// min_system_version = "11.0"
/// ```
///
/// # See Also
///
/// - [`MacOsSettings`] - signing and notarization
/// - [`DmgSettings`] - disk image configuration
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BundleSettings {
    /// Bundle identifier prefix in reverse domain notation.
    ///
    /// The product name is appended: `com.example` becomes `com.example.myapp`.
    ///
    /// Default: None ("org.me")
    #[serde(default)]
    pub identifier: Option<String>,

    /// Extension of the bundle folder.
    ///
    /// Default: None (".app")
    #[serde(default)]
    pub extension: Option<String>,

    /// `.icns` file copied into `Contents/Resources`.
    ///
    /// Default: None (`CFBundleIconFile` is "app.icns")
    #[serde(default)]
    pub icon: Option<PathBuf>,

    /// Files or folders copied into `Contents/Resources`.
    ///
    /// Default: Empty
    #[serde(default)]
    pub resources: Vec<PathBuf>,

    /// Directory the bundle is created in.
    ///
    /// Default: None (the executable's directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// macOS-specific settings.
    #[serde(default)]
    pub macos: MacOsSettings,

    /// DMG-specific settings.
    #[serde(default)]
    pub dmg: DmgSettings,
}

impl BundleSettings {
    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or(DEFAULT_IDENTIFIER)
    }

    /// Extension with a leading dot.
    pub fn extension(&self) -> String {
        match self.extension.as_deref() {
            None | Some("") => DEFAULT_EXTENSION.to_string(),
            Some(ext) if ext.starts_with('.') => ext.to_string(),
            Some(ext) => format!(".{ext}"),
        }
    }
}
