//! Notarization and stapling with `xcrun`.

use crate::bundler::{
    error::{Error, Result},
    utils::{command::run, progress::Spinner},
};
use std::ffi::OsString;
use std::path::Path;

/// Submits `dmg` to Apple's notary service and waits for the verdict.
///
/// This can take several minutes; a spinner is shown meanwhile.
///
/// # Errors
/// - [`Error::ConfigurationError`] without a keychain profile
/// - [`Error::NotarizationError`] if the submission fails or is rejected
pub async fn notarize_dmg(dmg: &Path, keychain_profile: Option<&str>, dry_run: bool) -> Result<()> {
    let profile = keychain_profile.ok_or_else(|| {
        Error::ConfigurationError(
            "Keychain profile required for notarization. \
             Set KEYCHAIN_PROFILE environment variable or pass --keychain-profile."
                .into(),
        )
    })?;

    log::info!("Notarizing DMG: {}", dmg.display());
    let args: [OsString; 6] = [
        "notarytool".into(),
        "submit".into(),
        dmg.into(),
        "--keychain-profile".into(),
        profile.into(),
        "--wait".into(),
    ];

    let spinner = (!dry_run).then(|| Spinner::start("Waiting for notarization"));
    let result = run("xcrun", &args, dry_run).await;
    drop(spinner);

    result.map_err(|e| {
        Error::NotarizationError(format!("Notarization failed for {}: {}", dmg.display(), e))
    })?;
    if !dry_run {
        log::info!("✓ Notarized {}", dmg.display());
    }
    Ok(())
}

/// Attaches the notarization ticket to `dmg`.
pub async fn staple_dmg(dmg: &Path, dry_run: bool) -> Result<()> {
    log::info!("Stapling DMG: {}", dmg.display());
    let args: [OsString; 3] = ["stapler".into(), "staple".into(), dmg.into()];
    run("xcrun", &args, dry_run).await.map_err(|e| {
        Error::NotarizationError(format!("Stapling failed for {}: {}", dmg.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notarization_requires_profile() {
        let err = notarize_dmg(Path::new("App.dmg"), None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn dry_run_only_logs() {
        notarize_dmg(Path::new("App.dmg"), Some("notary"), true)
            .await
            .unwrap();
        staple_dmg(Path::new("App.dmg"), true).await.unwrap();
    }
}
