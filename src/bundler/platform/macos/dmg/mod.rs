//! macOS DMG disk image packaging.
//!
//! Creates a compressed disk image of a bundle or folder, signs it with a
//! Developer ID, submits it for notarization and staples the ticket.
//!
//! # Architecture
//!
//! - `creation` - hdiutil image creation and DMG signing
//! - `notarize` - notarytool submission and stapling

mod creation;
mod notarize;

pub use creation::{create_dmg, find_or_create_app_bundle, sign_dmg};
pub use notarize::{notarize_dmg, staple_dmg};

use super::sign::{Codesigner, is_signable_folder};
use crate::bundler::{
    builder::signing::developer_id,
    error::{Error, ErrorExt, Result},
    settings::{DmgSettings, MacOsSettings, Settings},
};
use std::path::{Path, PathBuf};

/// Release workflow for one source bundle or folder.
///
/// # Process
/// 1. Sign the bundles in the source (Developer ID only)
/// 2. Create the DMG
/// 3. Sign the DMG
/// 4. Notarize (needs a keychain profile)
/// 5. Staple (only after notarizing)
///
/// Missing credentials skip steps 3 to 5 with a warning.
#[derive(Debug)]
pub struct Packager {
    source: PathBuf,
    output: PathBuf,
    volume_name: String,
    dev_id: Option<String>,
    macos: MacOsSettings,
    sign_contents: bool,
    dry_run: bool,
}

impl Packager {
    /// # Errors
    /// - [`Error::ConfigurationError`] if `source` does not exist
    /// - [`Error::ValidationError`] for a malformed Developer ID
    pub fn new(
        source: impl Into<PathBuf>,
        dmg: &DmgSettings,
        macos: &MacOsSettings,
        dry_run: bool,
    ) -> Result<Self> {
        let source = source.into();
        if !source.exists() {
            return Err(Error::ConfigurationError(format!(
                "Source does not exist: {}",
                source.display()
            )));
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = dmg.output.clone().unwrap_or_else(|| {
            source
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(format!("{stem}.dmg"))
        });
        let volume_name = dmg.volume_name.clone().unwrap_or(stem);

        Ok(Self {
            dev_id: developer_id(macos.signing_identity.as_deref())?,
            source,
            output,
            volume_name,
            macos: macos.clone(),
            sign_contents: !dmg.skip_content_signing,
            dry_run,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn dev_id(&self) -> Option<&str> {
        self.dev_id.as_deref()
    }

    /// Bundles the source consists of: itself if it is one, else its children.
    pub fn bundles_to_sign(&self) -> Result<Vec<PathBuf>> {
        if is_signable_folder(&self.source) {
            return Ok(vec![self.source.clone()]);
        }
        let mut bundles = Vec::new();
        for entry in
            std::fs::read_dir(&self.source).fs_context("failed to read directory", &self.source)?
        {
            let path = entry
                .fs_context("failed to read directory", &self.source)?
                .path();
            if is_signable_folder(&path) {
                bundles.push(path);
            }
        }
        bundles.sort();
        Ok(bundles)
    }

    /// Recursively signs every bundle in the source with the Developer ID.
    pub async fn sign_bundle_contents(&self) -> Result<()> {
        if self.dev_id.is_none() {
            log::warn!("No Developer ID provided, skipping content signing");
            return Ok(());
        }

        log::info!("Signing contents of {}", self.source.display());
        for bundle in self.bundles_to_sign()? {
            Codesigner::new(bundle, &self.macos, self.dry_run)?
                .process()
                .await?;
        }
        Ok(())
    }

    /// Runs the whole workflow and returns the DMG path.
    pub async fn process(&self) -> Result<PathBuf> {
        log::info!("Starting packaging workflow for {}", self.source.display());
        let notarize = !self.macos.skip_notarization;
        let staple = !self.macos.skip_stapling;
        let profile = self.macos.keychain_profile.as_deref();

        if self.sign_contents {
            self.sign_bundle_contents().await?;
        }

        create_dmg(&self.source, &self.output, &self.volume_name, self.dry_run).await?;

        if self.dev_id.is_some() {
            sign_dmg(&self.output, self.dev_id(), self.dry_run).await?;
        } else {
            log::warn!("Skipping DMG signing (no Developer ID)");
        }

        let notarized = match (notarize, profile) {
            (true, Some(_)) => {
                notarize_dmg(&self.output, profile, self.dry_run).await?;
                true
            }
            (true, None) => {
                log::warn!("Skipping notarization (no keychain profile)");
                false
            }
            (false, _) => false,
        };

        if staple && notarized {
            staple_dmg(&self.output, self.dry_run).await?;
        } else if staple && notarize {
            log::warn!("Skipping stapling (not notarized)");
        }

        log::info!("✓ Packaging complete: {}", self.output.display());
        Ok(self.output.clone())
    }
}

/// Bundle project as DMG disk image
///
/// # Process
/// 1. Find the .app or create it via `app::bundle_project()`
/// 2. Package it with [`Packager`]; the image defaults to
///    `{ProductName}-{Version}.dmg` next to the bundle
///
/// # Returns
/// Vector containing path to created DMG file.
pub async fn bundle_project(settings: &Settings) -> Result<Vec<PathBuf>> {
    log::info!("Creating DMG for {}", settings.product_name());

    let app_bundle_path = if settings.dry_run() {
        settings.bundle_path()
    } else {
        find_or_create_app_bundle(settings).await?
    };

    let bundle_settings = settings.bundle_settings();
    let mut dmg = bundle_settings.dmg.clone();
    if dmg.output.is_none() {
        let dir = app_bundle_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        dmg.output = Some(dir.join(format!(
            "{}-{}.dmg",
            settings.product_name(),
            settings.version_string()
        )));
    }
    if dmg.volume_name.is_none() {
        dmg.volume_name = Some(settings.product_name().to_string());
    }

    if settings.dry_run() && !app_bundle_path.exists() {
        log::info!(
            "[DRY RUN] Would package {} into {}",
            app_bundle_path.display(),
            dmg.output.as_deref().unwrap_or(Path::new("")).display()
        );
        return Ok(dmg.output.into_iter().collect());
    }

    let packager = Packager::new(app_bundle_path, &dmg, &bundle_settings.macos, settings.dry_run())?;
    let dmg_path = packager.process().await?;
    Ok(vec![dmg_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_configuration_error() {
        let err = Packager::new(
            "/nonexistent/App.app",
            &DmgSettings::default(),
            &MacOsSettings::default(),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn output_and_volume_default_to_source_stem() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("MyApp.app");
        std::fs::create_dir(&app).unwrap();

        let packager =
            Packager::new(&app, &DmgSettings::default(), &MacOsSettings::default(), true).unwrap();
        assert_eq!(packager.output(), dir.path().join("MyApp.dmg"));
        assert_eq!(packager.volume_name(), "MyApp");
        assert_eq!(packager.dev_id(), None);
    }

    #[test]
    fn dash_developer_id_means_none() {
        let dir = tempfile::tempdir().unwrap();
        let macos = MacOsSettings {
            signing_identity: Some("-".into()),
            ..Default::default()
        };
        let packager = Packager::new(dir.path(), &DmgSettings::default(), &macos, true).unwrap();
        assert_eq!(packager.dev_id(), None);

        let macos = MacOsSettings {
            signing_identity: Some("not valid!".into()),
            ..Default::default()
        };
        assert!(Packager::new(dir.path(), &DmgSettings::default(), &macos, true).is_err());
    }

    #[test]
    fn folder_source_signs_contained_bundles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("B.app")).unwrap();
        std::fs::create_dir(dir.path().join("A.bundle")).unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();

        let packager =
            Packager::new(dir.path(), &DmgSettings::default(), &MacOsSettings::default(), true)
                .unwrap();
        assert_eq!(
            packager.bundles_to_sign().unwrap(),
            vec![dir.path().join("A.bundle"), dir.path().join("B.app")]
        );
    }

    #[tokio::test]
    async fn dry_run_process_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("MyApp.app");
        std::fs::create_dir(&app).unwrap();
        let macos = MacOsSettings {
            signing_identity: Some("Jane Doe (ABCDE12345)".into()),
            keychain_profile: Some("notary".into()),
            skip_verification: true,
            ..Default::default()
        };
        let dmg = DmgSettings {
            output: Some(dir.path().join("out.dmg")),
            volume_name: Some("Install".into()),
            ..Default::default()
        };

        let packager = Packager::new(&app, &dmg, &macos, true).unwrap();
        let out = packager.process().await.unwrap();
        assert_eq!(out, dir.path().join("out.dmg"));
        assert!(!out.exists());
    }
}
