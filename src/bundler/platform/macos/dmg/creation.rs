//! DMG creation and signing using hdiutil and codesign.

use crate::bundler::{
    builder::signing::DEVELOPER_ID_PREFIX,
    error::{Error, ErrorExt, Result},
    settings::Settings,
    utils::command::run,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::remove_file;

/// Find existing .app bundle or create new one
///
/// # Logic
/// 1. Check if the bundle exists at [`Settings::bundle_path`]
/// 2. If found and is directory → use existing
/// 3. If not found → call `app::bundle_project()` to create it
pub async fn find_or_create_app_bundle(settings: &Settings) -> Result<PathBuf> {
    let expected_path = settings.bundle_path();

    if expected_path.is_dir() {
        log::debug!("Using existing bundle: {}", expected_path.display());
        return Ok(expected_path);
    }

    log::info!("Creating app bundle for DMG...");
    let paths = super::super::app::bundle_project(settings).await?;

    paths
        .into_iter()
        .next()
        .ok_or_else(|| Error::GenericError("Failed to create app bundle".into()))
}

/// Create a compressed (UDZO) DMG of `source` with hdiutil.
///
/// An existing image at `output` is replaced. With `dry_run` the command is
/// only logged.
///
/// # Errors
/// [`Error::PackagingError`] if hdiutil reports success but no image exists.
pub async fn create_dmg(
    source: &Path,
    output: &Path,
    volume_name: &str,
    dry_run: bool,
) -> Result<PathBuf> {
    log::info!("Creating DMG: {}", output.display());

    if output.exists() && !dry_run {
        remove_file(output)
            .await
            .fs_context("failed to remove existing DMG", output)?;
    }

    let args: [OsString; 9] = [
        "create".into(),
        "-volname".into(),
        volume_name.into(),
        "-srcfolder".into(),
        source.into(),
        "-ov".into(),
        "-format".into(),
        "UDZO".into(),
        output.into(),
    ];
    run("hdiutil", &args, dry_run).await?;

    if !dry_run && !output.exists() {
        return Err(Error::PackagingError(format!(
            "Failed to create DMG: {}",
            output.display()
        )));
    }

    if !dry_run {
        log::info!("✓ Created DMG: {}", output.display());
    }
    Ok(output.to_path_buf())
}

/// Sign the DMG with a Developer ID and the hardened runtime.
///
/// # Errors
/// [`Error::ConfigurationError`] without a Developer ID; ad-hoc signatures
/// are useless on a disk image.
pub async fn sign_dmg(dmg: &Path, dev_id: Option<&str>, dry_run: bool) -> Result<()> {
    let dev_id = dev_id.ok_or_else(|| {
        Error::ConfigurationError(
            "Developer ID required for DMG signing. \
             Set DEV_ID environment variable or pass --dev-id."
                .into(),
        )
    })?;

    log::info!("Signing DMG: {}", dmg.display());
    let args: [OsString; 7] = [
        "--sign".into(),
        format!("{DEVELOPER_ID_PREFIX}{dev_id}").into(),
        "--force".into(),
        "--verbose".into(),
        "--options".into(),
        "runtime".into(),
        dmg.into(),
    ];
    run("codesign", &args, dry_run).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_keeps_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("App.dmg");
        std::fs::write(&output, "old").unwrap();

        let path = create_dmg(dir.path(), &output, "App", true).await.unwrap();
        assert_eq!(path, output);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "old");
    }

    #[tokio::test]
    async fn signing_requires_developer_id() {
        let err = sign_dmg(Path::new("App.dmg"), None, true).await.unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
        sign_dmg(Path::new("App.dmg"), Some("Jane Doe"), true)
            .await
            .unwrap();
    }
}
