//! macOS application bundle (.app) creation.
//!
//! # Layout
//!
//! ```text
//! MyApp.app/
//! └── Contents/
//!     ├── Info.plist
//!     ├── PkgInfo
//!     ├── MacOS/myapp
//!     ├── Frameworks/
//!     ├── Resources/
//!     └── libs/        bundled dylibs
//! ```

use super::{
    dylib::{BundleReport, DylibBundler},
    lipo,
};
use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::{DEFAULT_INSIDE_LIB_PATH, DylibSettings, Settings},
    utils::fs::{self, ValidationOptions, validate_file},
};
use plist::{Dictionary, Value};
use std::path::{Path, PathBuf};

/// Contents of `Contents/PkgInfo`.
pub const PKG_INFO: &str = "APPL????";

/// `CFBundleIconFile` when no icon is configured.
const DEFAULT_ICON_FILE: &str = "app.icns";

/// Paths of one bundle under construction.
#[derive(Debug)]
pub struct AppBundle<'a> {
    settings: &'a Settings,
    bundle: PathBuf,
    contents: PathBuf,
    executable: PathBuf,
}

impl<'a> AppBundle<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let bundle = settings.bundle_path();
        let contents = bundle.join("Contents");
        let executable_name = settings
            .executable()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(settings.product_name()));
        let executable = contents.join("MacOS").join(executable_name);
        Self {
            settings,
            bundle,
            contents,
            executable,
        }
    }

    pub fn path(&self) -> &Path {
        &self.bundle
    }

    pub fn macos_dir(&self) -> PathBuf {
        self.contents.join("MacOS")
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.contents.join("libs")
    }

    pub fn frameworks_dir(&self) -> PathBuf {
        self.contents.join("Frameworks")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.contents.join("Resources")
    }

    pub fn info_plist_path(&self) -> PathBuf {
        self.contents.join("Info.plist")
    }

    pub fn pkg_info_path(&self) -> PathBuf {
        self.contents.join("PkgInfo")
    }

    /// The copied executable inside `Contents/MacOS`.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn dry_run(&self) -> bool {
        self.settings.dry_run()
    }

    /// Creates the complete bundle and returns its path.
    pub async fn create(&self) -> Result<PathBuf> {
        if self.dry_run() {
            log::info!("[DRY RUN] Would create bundle at {}", self.bundle.display());
        } else {
            log::info!("Creating bundle at {}", self.bundle.display());
            fs::create_dir_all(&self.macos_dir(), false).await?;
            fs::create_dir_all(&self.frameworks_dir(), false).await?;
        }

        self.create_executable().await?;
        self.write_info_plist()?;
        self.write_pkg_info()?;
        self.create_resources().await?;
        self.bundle_dependencies().await?;

        if self.dry_run() {
            log::info!("[DRY RUN] Bundle would be created at: {}", self.bundle.display());
        } else {
            log::info!("✓ Created bundle: {}", self.bundle.display());
        }
        Ok(self.bundle.clone())
    }

    /// Validates the target, logs its architectures and copies it into
    /// `Contents/MacOS` with the executable bits set.
    pub async fn create_executable(&self) -> Result<()> {
        let target = self.settings.executable();
        validate_file(target, &ValidationOptions::executable())?;

        let archs = lipo::architectures(target).await;
        if archs.len() > 1 {
            log::info!("Target is universal binary: {}", archs.join(", "));
        } else if let Some(arch) = archs.first() {
            log::info!("Target architecture: {}", arch);
        }

        if self.dry_run() {
            log::info!(
                "[DRY RUN] Would copy {} to {}",
                target.display(),
                self.executable.display()
            );
            return Ok(());
        }

        fs::copy_file(target, &self.executable).await?;
        fs::make_executable(&self.executable).await
    }

    /// Keys written to `Info.plist`.
    pub fn info_plist(&self) -> Dictionary {
        let name = self.settings.product_name();
        let version = self.settings.version_string();
        let bundle_settings = self.settings.bundle_settings();
        let executable = self
            .executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let icon_file = bundle_settings
            .icon
            .as_ref()
            .and_then(|icon| icon.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_ICON_FILE.to_string());

        let mut dict = Dictionary::new();
        dict.insert("CFBundleDevelopmentRegion".into(), "English".into());
        dict.insert("CFBundleExecutable".into(), executable.into());
        dict.insert(
            "CFBundleGetInfoString".into(),
            format!("{name} {version}").into(),
        );
        dict.insert("CFBundleIconFile".into(), icon_file.into());
        dict.insert(
            "CFBundleIdentifier".into(),
            self.settings.bundle_identifier().into(),
        );
        dict.insert("CFBundleInfoDictionaryVersion".into(), "6.0".into());
        dict.insert("CFBundleName".into(), name.into());
        dict.insert("CFBundlePackageType".into(), "APPL".into());
        dict.insert("CFBundleShortVersionString".into(), version.into());
        dict.insert("CFBundleSignature".into(), "????".into());
        dict.insert("CFBundleVersion".into(), version.into());
        dict.insert(
            "LSMinimumSystemVersion".into(),
            bundle_settings.macos.minimum_system_version().into(),
        );
        dict.insert("NSAppleScriptEnabled".into(), "YES".into());
        dict.insert("NSHighResolutionCapable".into(), true.into());
        dict.insert("NSMainNibFile".into(), "MainMenu".into());
        dict.insert("NSPrincipalClass".into(), "NSApplication".into());
        dict
    }

    pub fn write_info_plist(&self) -> Result<()> {
        let path = self.info_plist_path();
        if self.dry_run() {
            log::info!("[DRY RUN] Would create {}", path.display());
            return Ok(());
        }
        Value::Dictionary(self.info_plist()).to_file_xml(&path)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    pub fn write_pkg_info(&self) -> Result<()> {
        let path = self.pkg_info_path();
        if self.dry_run() {
            log::info!("[DRY RUN] Would create {}", path.display());
            return Ok(());
        }
        std::fs::write(&path, PKG_INFO).fs_context("failed to write PkgInfo", &path)
    }

    /// Copies the configured resources and icon into `Contents/Resources`.
    ///
    /// Everything is validated before anything is copied.
    pub async fn create_resources(&self) -> Result<()> {
        let bundle_settings = self.settings.bundle_settings();
        let icon = bundle_settings.icon.as_deref();
        let resources = &bundle_settings.resources;

        if let Some(icon) = icon {
            validate_file(icon, &ValidationOptions::default())?;
        }
        for resource in resources {
            if !resource.exists() {
                return Err(Error::ValidationError(format!(
                    "Resource does not exist: {}",
                    resource.display()
                )));
            }
        }

        if self.dry_run() {
            for resource in resources {
                log::info!("[DRY RUN] Would copy {} to Resources", resource.display());
            }
            if let Some(icon) = icon {
                log::info!("[DRY RUN] Would copy icon {} to Resources", icon.display());
            }
            return Ok(());
        }

        if resources.is_empty() && icon.is_none() {
            return Ok(());
        }

        let dest = self.resources_dir();
        fs::create_dir_all(&dest, false).await?;

        for resource in resources {
            let name = resource.file_name().ok_or_else(|| {
                Error::ValidationError(format!("Invalid resource path: {}", resource.display()))
            })?;
            if resource.is_dir() {
                fs::copy_dir(resource, &dest.join(name)).await?;
            } else {
                fs::copy_file(resource, &dest.join(name)).await?;
            }
        }

        if let Some(icon) = icon {
            if let Some(name) = icon.file_name() {
                fs::copy_file(icon, &dest.join(name)).await?;
                log::info!("Added icon: {}", name.to_string_lossy());
            }
        }
        Ok(())
    }

    /// Settings for bundling the executable's libraries into `Contents/libs`.
    pub fn dylib_settings(&self) -> DylibSettings {
        DylibSettings {
            overwrite_dir: true,
            create_dir: true,
            codesign: self.settings.codesign(),
            inside_lib_path: DEFAULT_INSIDE_LIB_PATH.to_string(),
            interactive: self.settings.interactive(),
            ..DylibSettings::new(self.libs_dir(), vec![self.executable.clone()])
        }
    }

    /// Bundles the dynamic libraries of the copied executable.
    pub async fn bundle_dependencies(&self) -> Result<Option<BundleReport>> {
        if self.dry_run() {
            log::info!(
                "[DRY RUN] Would bundle dynamic libraries for {}",
                self.executable.display()
            );
            return Ok(None);
        }

        log::info!(
            "Bundling dynamic libraries for {}",
            self.executable.display()
        );
        let settings = self.dylib_settings();
        let report = tokio::task::spawn_blocking(move || DylibBundler::new(settings)?.run())
            .await
            .map_err(|e| Error::GenericError(format!("dependency bundling task failed: {e}")))??;
        Ok(Some(report))
    }
}

/// Bundle project as a macOS `.app`.
///
/// # Returns
/// Vector containing the path of the created bundle.
pub async fn bundle_project(settings: &Settings) -> Result<Vec<PathBuf>> {
    log::info!("Creating app bundle for {}", settings.product_name());
    let path = AppBundle::new(settings).create().await?;
    Ok(vec![path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{BundleSettings, SettingsBuilder};

    const MACHO: &[u8] = b"\xcf\xfa\xed\xfe\x07\x00\x00\x01";

    fn fake_executable(dir: &Path) -> PathBuf {
        let exe = dir.join("myapp");
        std::fs::write(&exe, MACHO).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        exe
    }

    fn settings(exe: &Path, bundle: BundleSettings, dry_run: bool) -> Settings {
        SettingsBuilder::new()
            .executable(exe)
            .version("2.5")
            .bundle_settings(bundle)
            .dry_run(dry_run)
            .interactive(false)
            .build()
            .unwrap()
    }

    #[test]
    fn info_plist_has_bundle_keys() {
        let settings = settings(
            Path::new("/build/myapp"),
            BundleSettings {
                identifier: Some("com.example".into()),
                icon: Some("/assets/shiny.icns".into()),
                ..Default::default()
            },
            false,
        );
        let dict = AppBundle::new(&settings).info_plist();
        let get = |key: &str| dict.get(key).and_then(Value::as_string).map(str::to_string);

        assert_eq!(get("CFBundleExecutable").as_deref(), Some("myapp"));
        assert_eq!(get("CFBundleIdentifier").as_deref(), Some("com.example.myapp"));
        assert_eq!(get("CFBundleName").as_deref(), Some("myapp"));
        assert_eq!(get("CFBundleGetInfoString").as_deref(), Some("myapp 2.5"));
        assert_eq!(get("CFBundleVersion").as_deref(), Some("2.5"));
        assert_eq!(get("CFBundleShortVersionString").as_deref(), Some("2.5"));
        assert_eq!(get("CFBundleIconFile").as_deref(), Some("shiny.icns"));
        assert_eq!(get("LSMinimumSystemVersion").as_deref(), Some("10.13"));
        assert_eq!(
            dict.get("NSHighResolutionCapable").and_then(Value::as_boolean),
            Some(true)
        );
    }

    #[test]
    fn default_icon_file_name() {
        let settings = settings(Path::new("/build/myapp"), BundleSettings::default(), false);
        let dict = AppBundle::new(&settings).info_plist();
        assert_eq!(
            dict.get("CFBundleIconFile").and_then(Value::as_string),
            Some("app.icns")
        );
    }

    #[tokio::test]
    async fn scaffolding_writes_plist_pkginfo_and_executable() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_executable(dir.path());
        let settings = settings(&exe, BundleSettings::default(), false);
        let app = AppBundle::new(&settings);
        fs::create_dir_all(&app.macos_dir(), false).await.unwrap();

        app.create_executable().await.unwrap();
        app.write_info_plist().unwrap();
        app.write_pkg_info().unwrap();

        assert_eq!(app.path(), dir.path().join("myapp.app"));
        assert_eq!(std::fs::read(app.executable()).unwrap(), MACHO);
        assert_eq!(std::fs::read_to_string(app.pkg_info_path()).unwrap(), "APPL????");

        let value = Value::from_file(app.info_plist_path()).unwrap();
        let dict = value.as_dictionary().unwrap();
        assert_eq!(
            dict.get("CFBundleIdentifier").and_then(Value::as_string),
            Some("org.me.myapp")
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(app.executable()).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn resources_and_icon_are_copied() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_executable(dir.path());
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(assets.join("nested")).unwrap();
        std::fs::write(assets.join("nested/data.txt"), "data").unwrap();
        let readme = dir.path().join("README.txt");
        std::fs::write(&readme, "hi").unwrap();
        let icon = dir.path().join("myapp.icns");
        std::fs::write(&icon, "icns").unwrap();

        let settings = settings(
            &exe,
            BundleSettings {
                resources: vec![assets, readme],
                icon: Some(icon),
                ..Default::default()
            },
            false,
        );
        let app = AppBundle::new(&settings);
        app.create_resources().await.unwrap();

        let res = app.resources_dir();
        assert_eq!(std::fs::read_to_string(res.join("assets/nested/data.txt")).unwrap(), "data");
        assert_eq!(std::fs::read_to_string(res.join("README.txt")).unwrap(), "hi");
        assert!(res.join("myapp.icns").is_file());
    }

    #[tokio::test]
    async fn missing_resource_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_executable(dir.path());
        let settings = settings(
            &exe,
            BundleSettings {
                resources: vec![dir.path().join("nope")],
                ..Default::default()
            },
            false,
        );
        let err = AppBundle::new(&settings).create_resources().await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert!(!dir.path().join("myapp.app").exists());
    }

    #[tokio::test]
    async fn dry_run_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_executable(dir.path());
        let settings = settings(&exe, BundleSettings::default(), true);

        let path = AppBundle::new(&settings).create().await.unwrap();
        assert_eq!(path, dir.path().join("myapp.app"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_macho_executable_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("script");
        std::fs::write(&exe, "#!/bin/sh\necho hi\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        let settings = settings(&exe, BundleSettings::default(), true);
        let err = AppBundle::new(&settings).create().await.unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
    }

    #[test]
    fn dylib_settings_target_bundle_libs() {
        let settings = settings(Path::new("/build/myapp"), BundleSettings::default(), false);
        let app = AppBundle::new(&settings);
        let dylib = app.dylib_settings();
        assert_eq!(dylib.dest_dir, PathBuf::from("/build/myapp.app/Contents/libs"));
        assert_eq!(dylib.files_to_fix, vec![PathBuf::from("/build/myapp.app/Contents/MacOS/myapp")]);
        assert!(dylib.overwrite_dir && dylib.create_dir);
        assert!(!dylib.interactive);
        assert_eq!(dylib.inner_prefix(), DEFAULT_INSIDE_LIB_PATH);
    }
}
