//! `macbundler create`: build a `.app` bundle from an executable.

use super::{format_size, require_input};
use crate::{
    bundler::{BundleSettings, Bundler, MacOsSettings, SettingsBuilder},
    cli::{CreateArgs, RuntimeConfig},
    config::Config,
    error::Result,
};

/// Bundle settings from the flags, falling back to the `[create]` section.
pub fn bundle_settings(args: &CreateArgs, config: &Config) -> BundleSettings {
    let create = &config.create;
    BundleSettings {
        identifier: args.id.clone().or_else(|| create.id.clone()),
        extension: args.extension.clone().or_else(|| create.extension.clone()),
        icon: args.icon.clone().or_else(|| create.icon.clone()),
        resources: args.resources.clone(),
        output_dir: args.output_dir.clone(),
        macos: MacOsSettings {
            minimum_system_version: args
                .min_system_version
                .clone()
                .or_else(|| create.min_system_version.clone()),
            ..MacOsSettings::default()
        },
        ..BundleSettings::default()
    }
}

pub async fn execute(args: &CreateArgs, config: &Config, runtime: &RuntimeConfig) -> Result<i32> {
    let output = runtime.output();
    if !require_input(runtime, "Executable", &args.executable)? {
        return Ok(1);
    }

    let mut builder = SettingsBuilder::new()
        .executable(&args.executable)
        .bundle_settings(bundle_settings(args, config))
        .dry_run(args.common.dry_run)
        .interactive(!args.common.non_interactive)
        .codesign(!args.common.no_sign);
    if let Some(version) = args.version.as_ref().or(config.create.version.as_ref()) {
        builder = builder.version(version);
    }
    let settings = builder.build()?;

    output.progress(&format!(
        "Creating {} {}",
        settings.product_name(),
        settings.version_string()
    ))?;
    let artifacts = Bundler::new(settings).bundle().await?;

    output.section("Artifacts")?;
    for artifact in &artifacts {
        for path in &artifact.paths {
            output.success(&format!("{}: {}", artifact.package_type, path.display()))?;
        }
        if !artifact.checksum.is_empty() {
            output.indent(&format!("size: {}", format_size(artifact.size)))?;
            output.verbose(&format!("  sha256: {}", artifact.checksum))?;
        }
    }
    Ok(0)
}
