//! macOS signing, notarization and disk image settings.

use std::path::PathBuf;

/// Default `LSMinimumSystemVersion`.
pub const DEFAULT_MINIMUM_SYSTEM_VERSION: &str = "10.13";

/// Code signing and notarization configuration.
///
/// # Configuration
///
/// Filled from the `[sign]` and `[package]` sections of `.macbundler.toml`:
///
/// ```toml
/// [sign]
/// dev_id = "Jane Doe (ABCDE12345)"
/// entitlements = "entitlements.plist"
///
/// [package]
/// keychain_profile = "notary"
/// ```
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct MacOsSettings {
    /// Minimum macOS version required (LSMinimumSystemVersion).
    ///
    /// Default: None ("10.13")
    #[serde(default)]
    pub minimum_system_version: Option<String>,

    /// Developer ID, either `Name` or `Name (TEAMID)`.
    ///
    /// Expanded to `Developer ID Application: <id>`. Use "-" for ad-hoc
    /// signing.
    ///
    /// Default: None (ad-hoc)
    #[serde(default)]
    pub signing_identity: Option<String>,

    /// Path to entitlements.plist, applied to the outermost signature.
    ///
    /// Default: None
    #[serde(default)]
    pub entitlements: Option<PathBuf>,

    /// Keychain profile stored with `xcrun notarytool store-credentials`.
    ///
    /// Default: None (notarization is skipped)
    #[serde(default)]
    pub keychain_profile: Option<String>,

    /// Skip notarization with Apple.
    ///
    /// Default: false
    #[serde(default)]
    pub skip_notarization: bool,

    /// Skip stapling the notarization ticket.
    ///
    /// Default: false
    #[serde(default)]
    pub skip_stapling: bool,

    /// Skip `codesign --verify` after signing.
    ///
    /// Default: false
    #[serde(default)]
    pub skip_verification: bool,
}

impl MacOsSettings {
    pub fn minimum_system_version(&self) -> &str {
        self.minimum_system_version
            .as_deref()
            .unwrap_or(DEFAULT_MINIMUM_SYSTEM_VERSION)
    }
}

/// DMG disk image configuration.
#[derive(Clone, Debug, Default, serde::Deserialize)]
pub struct DmgSettings {
    /// Output path of the disk image.
    ///
    /// Default: None (`<source stem>.dmg` beside the source)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Volume name shown when the image is mounted.
    ///
    /// Default: None (source stem)
    #[serde(default)]
    pub volume_name: Option<String>,

    /// Do not sign the bundles placed in the image before creating it.
    ///
    /// Default: false
    #[serde(default)]
    pub skip_content_signing: bool,
}
