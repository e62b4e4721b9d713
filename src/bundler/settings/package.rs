//! Package metadata.

/// Default version written into Info.plist.
pub const DEFAULT_VERSION: &str = "1.0";

/// Package metadata shared by the bundle and the disk image.
///
/// # Examples
///
/// ```no_run
/// use macbundler::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     product_name: "MyApp".into(),
///     version: "2.1".into(),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PackageSettings {
    /// Product name, used for the bundle name, `CFBundleName` and the DMG volume.
    ///
    /// Usually the file stem of the executable.
    pub product_name: String,

    /// Version string (`CFBundleVersion`, `CFBundleShortVersionString`).
    ///
    /// Default: "1.0"
    pub version: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}
