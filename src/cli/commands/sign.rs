//! `macbundler sign`: recursively codesign a bundle.

use super::require_input;
use crate::{
    bundler::{Bundler, MacOsSettings},
    cli::{RuntimeConfig, SignArgs},
    config::Config,
    error::Result,
};

pub fn macos_settings(args: &SignArgs, config: &Config) -> MacOsSettings {
    MacOsSettings {
        signing_identity: args.dev_id.clone().or_else(|| config.sign.dev_id.clone()),
        entitlements: args
            .entitlements
            .clone()
            .or_else(|| config.sign.entitlements.clone()),
        skip_verification: args.no_verify,
        ..MacOsSettings::default()
    }
}

pub async fn execute(args: &SignArgs, config: &Config, runtime: &RuntimeConfig) -> Result<i32> {
    let output = runtime.output();
    if !require_input(runtime, "Bundle", &args.bundle)? {
        return Ok(1);
    }

    let macos = macos_settings(args, config);
    if macos.signing_identity.is_none() {
        output.verbose("No Developer ID given, signing ad-hoc")?;
    }
    output.progress(&format!("Signing {}", args.bundle.display()))?;
    Bundler::sign(&args.bundle, &macos, args.dry_run).await?;
    output.success(&format!("Signed {}", args.bundle.display()))?;
    Ok(0)
}
