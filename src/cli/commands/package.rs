//! `macbundler package`: DMG creation, signing, notarization and stapling.

use super::{format_size, require_input};
use crate::{
    bundler::{Bundler, DmgSettings, MacOsSettings},
    cli::{PackageArgs, RuntimeConfig},
    config::Config,
    error::Result,
};

pub fn package_settings(args: &PackageArgs, config: &Config) -> (DmgSettings, MacOsSettings) {
    let package = &config.package;
    let dmg = DmgSettings {
        output: args.output.clone(),
        volume_name: args.name.clone(),
        skip_content_signing: args.no_sign,
    };
    let macos = MacOsSettings {
        signing_identity: args.dev_id.clone().or_else(|| package.dev_id.clone()),
        entitlements: args
            .entitlements
            .clone()
            .or_else(|| package.entitlements.clone()),
        keychain_profile: args
            .keychain_profile
            .clone()
            .or_else(|| package.keychain_profile.clone()),
        skip_notarization: args.no_notarize,
        skip_stapling: args.no_staple,
        ..MacOsSettings::default()
    };
    (dmg, macos)
}

pub async fn execute(args: &PackageArgs, config: &Config, runtime: &RuntimeConfig) -> Result<i32> {
    let output = runtime.output();
    if !require_input(runtime, "Source", &args.source)? {
        return Ok(1);
    }

    let (dmg, macos) = package_settings(args, config);
    if macos.signing_identity.is_none() {
        output.warn("No Developer ID given; the DMG will not be signed")?;
    }
    output.progress(&format!("Packaging {}", args.source.display()))?;
    let artifact = Bundler::package(&args.source, &dmg, &macos, args.dry_run).await?;

    for path in &artifact.paths {
        output.success(&format!("Created {}", path.display()))?;
    }
    if !artifact.checksum.is_empty() {
        output.indent(&format!("size:   {}", format_size(artifact.size)))?;
        output.indent(&format!("sha256: {}", artifact.checksum))?;
    }
    Ok(0)
}
