//! `macbundler fix`: bundle dylibs next to existing binaries.

use super::require_input;
use crate::{
    bundler::{
        Bundler, DylibSettings, platform::macos::dylib::BundleReport,
        settings::DEFAULT_INSIDE_LIB_PATH,
    },
    cli::{FixArgs, RuntimeConfig},
    config::Config,
    error::Result,
};
use std::path::Path;

/// Engine settings from the flags and the `[fix]` section.
///
/// Search and exclude lists from both sources are combined, flags first.
pub fn dylib_settings(args: &FixArgs, config: &Config) -> DylibSettings {
    let fix = &config.fix;
    DylibSettings {
        overwrite_dir: args.force,
        create_dir: true,
        codesign: !args.common.no_sign,
        inside_lib_path: args
            .prefix
            .clone()
            .or_else(|| fix.prefix.clone())
            .unwrap_or_else(|| DEFAULT_INSIDE_LIB_PATH.to_string()),
        search_paths: args.search.iter().chain(&fix.search).cloned().collect(),
        prefixes_to_ignore: args.exclude.iter().chain(&fix.exclude).cloned().collect(),
        interactive: !args.common.non_interactive,
        dry_run: args.common.dry_run,
        ..DylibSettings::new(&args.dest, args.files.clone())
    }
}

/// One-line result of a run, naming where the libraries went.
fn summary(report: &BundleReport, dest_dir: &Path) -> String {
    let count = report.dependencies.len();
    format!(
        "Bundled {} librar{} into {}, fixed {} file(s)",
        count,
        if count == 1 { "y" } else { "ies" },
        dest_dir.display(),
        report.rewrite.fixed.len()
    )
}

pub async fn execute(args: &FixArgs, config: &Config, runtime: &RuntimeConfig) -> Result<i32> {
    let output = runtime.output();
    for file in &args.files {
        if !require_input(runtime, "File", file)? {
            return Ok(1);
        }
    }

    let settings = dylib_settings(args, config);
    let dest_dir = settings.dest_dir.clone();
    output.progress(&format!("Bundling dependencies into {}", dest_dir.display()))?;
    let report = Bundler::fix(settings).await?;

    output.verbose(&format!(
        "Dependency closure complete after {} pass(es)",
        report.passes
    ))?;
    output.success(&summary(&report, &dest_dir))?;
    for dep in &report.dependencies {
        output.verbose(&format!("  {}", dep))?;
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FixOptions;
    use std::path::PathBuf;

    fn args() -> FixArgs {
        FixArgs {
            files: vec![PathBuf::from("main")],
            dest: PathBuf::from("libs"),
            prefix: None,
            search: vec![PathBuf::from("/flag/lib")],
            exclude: vec![],
            force: true,
            common: FixOptions {
                dry_run: false,
                non_interactive: true,
                no_sign: true,
            },
        }
    }

    #[test]
    fn merges_flags_and_config() {
        let mut config = Config::default();
        config.fix.prefix = Some("@rpath/".into());
        config.fix.search = vec![PathBuf::from("/config/lib")];
        config.fix.exclude = vec![PathBuf::from("/opt/skip")];

        let settings = dylib_settings(&args(), &config);
        assert_eq!(settings.inside_lib_path, "@rpath/");
        assert_eq!(
            settings.search_paths,
            vec![PathBuf::from("/flag/lib"), PathBuf::from("/config/lib")]
        );
        assert_eq!(settings.prefixes_to_ignore, vec![PathBuf::from("/opt/skip")]);
        assert!(settings.overwrite_dir);
        assert!(settings.create_dir);
        assert!(!settings.codesign);
        assert!(!settings.interactive);
        assert_eq!(settings.files_to_fix, vec![PathBuf::from("main")]);
    }

    #[test]
    fn summary_names_destination() {
        let report = BundleReport {
            rewrite: crate::bundler::platform::macos::dylib::RewriteSummary {
                installed: vec![],
                fixed: vec![PathBuf::from("main")],
            },
            ..BundleReport::default()
        };
        assert_eq!(
            summary(&report, Path::new("App.app/Contents/libs")),
            "Bundled 0 libraries into App.app/Contents/libs, fixed 1 file(s)"
        );
    }

    #[test]
    fn prefix_defaults_to_executable_path_libs() {
        let settings = dylib_settings(&args(), &Config::default());
        assert_eq!(settings.inside_lib_path, DEFAULT_INSIDE_LIB_PATH);
    }
}
