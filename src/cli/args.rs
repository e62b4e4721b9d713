//! Command line argument parsing.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Bundle, sign and package macOS applications
#[derive(Parser, Debug)]
#[command(
    name = "macbundler",
    version,
    about = "Bundle, sign and package macOS applications",
    long_about = "Creates self-contained macOS application bundles.

Copies every non-system dylib an executable needs into the bundle and rewrites
load commands so the bundle runs on machines without those libraries, then
signs, packages, notarizes and staples it.

Usage:
  macbundler create target/release/myapp -i com.example -v 1.2
  macbundler fix MyApp.app/Contents/MacOS/myapp -d MyApp.app/Contents/libs/
  macbundler sign MyApp.app -i 'Jane Doe (ABCDE12345)'
  macbundler package MyApp.app -k notary"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: ./.macbundler.toml, ./macbundler.toml,
    /// then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an application bundle from an executable
    Create(CreateArgs),
    /// Bundle dylibs and fix load commands of existing files
    Fix(FixArgs),
    /// Recursively codesign a bundle
    Sign(SignArgs),
    /// Create, sign, notarize and staple a DMG
    Package(PackageArgs),
}

#[derive(ClapArgs, Debug)]
pub struct CreateArgs {
    /// Executable to bundle
    #[arg(value_name = "EXECUTABLE")]
    pub executable: PathBuf,

    /// Directory the bundle is created in (default: the executable's directory)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Bundle version (default: 1.0)
    #[arg(short = 'v', long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Bundle identifier prefix (default: org.me)
    #[arg(short = 'i', long, value_name = "ID")]
    pub id: Option<String>,

    /// Bundle extension (default: .app)
    #[arg(short = 'e', long, value_name = "EXT")]
    pub extension: Option<String>,

    /// File or folder to copy into Contents/Resources (repeatable)
    #[arg(short = 'r', long = "resource", value_name = "PATH")]
    pub resources: Vec<PathBuf>,

    /// Icon file (.icns)
    #[arg(long, value_name = "FILE")]
    pub icon: Option<PathBuf>,

    /// Minimum macOS version (default: 10.13)
    #[arg(long, value_name = "VERSION")]
    pub min_system_version: Option<String>,

    #[command(flatten)]
    pub common: FixOptions,
}

/// Options shared by the subcommands that bundle dylibs.
#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct FixOptions {
    /// Show what would be done without doing it
    #[arg(long)]
    pub dry_run: bool,

    /// Fail instead of prompting for libraries that cannot be found
    #[arg(long)]
    pub non_interactive: bool,

    /// Disable ad-hoc codesigning of bundled libraries
    #[arg(long)]
    pub no_sign: bool,
}

#[derive(ClapArgs, Debug)]
pub struct FixArgs {
    /// Files to fix (executables or plugins)
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Destination directory for bundled libraries
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dest: PathBuf,

    /// Library install path prefix (default: @executable_path/../libs/)
    #[arg(short = 'p', long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Additional search path, `*` allowed (repeatable)
    #[arg(short = 's', long, value_name = "DIR")]
    pub search: Vec<PathBuf>,

    /// Never bundle libraries from this directory (repeatable)
    #[arg(short = 'x', long, value_name = "DIR")]
    pub exclude: Vec<PathBuf>,

    /// Overwrite the destination directory if it exists
    #[arg(short = 'f', long)]
    pub force: bool,

    #[command(flatten)]
    pub common: FixOptions,
}

#[derive(ClapArgs, Debug)]
pub struct SignArgs {
    /// Bundle to sign (.app, .bundle, .framework, .mxo)
    #[arg(value_name = "BUNDLE")]
    pub bundle: PathBuf,

    /// Developer ID, `Name` or `Name (TEAMID)`; `-` for ad-hoc
    #[arg(short = 'i', long, env = "DEV_ID", value_name = "DEV_ID")]
    pub dev_id: Option<String>,

    /// Entitlements plist
    #[arg(short = 'e', long, value_name = "FILE")]
    pub entitlements: Option<PathBuf>,

    /// Show what would be signed without signing
    #[arg(long)]
    pub dry_run: bool,

    /// Skip signature verification
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(ClapArgs, Debug)]
pub struct PackageArgs {
    /// Bundle or folder to package
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Output DMG path (default: <source>.dmg)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Volume name (default: source name)
    #[arg(short = 'n', long, value_name = "NAME")]
    pub name: Option<String>,

    /// Developer ID, `Name` or `Name (TEAMID)`
    #[arg(short = 'i', long, env = "DEV_ID", value_name = "DEV_ID")]
    pub dev_id: Option<String>,

    /// Keychain profile for notarytool
    #[arg(short = 'k', long, env = "KEYCHAIN_PROFILE", value_name = "PROFILE")]
    pub keychain_profile: Option<String>,

    /// Entitlements plist
    #[arg(short = 'e', long, value_name = "FILE")]
    pub entitlements: Option<PathBuf>,

    /// Do not sign bundle contents before packaging
    #[arg(long)]
    pub no_sign: bool,

    /// Skip notarization
    #[arg(long)]
    pub no_notarize: bool,

    /// Skip stapling
    #[arg(long)]
    pub no_staple: bool,

    /// Show commands without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, false),
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_fix() {
        let args = Args::parse_from([
            "macbundler", "fix", "main", "plugin.so", "-d", "libs", "-s", "/opt/lib", "-s",
            "/usr/local/lib", "-x", "/opt/skip", "-f", "--non-interactive",
        ]);
        let Command::Fix(fix) = args.command else {
            panic!("expected fix");
        };
        assert_eq!(fix.files, vec![PathBuf::from("main"), PathBuf::from("plugin.so")]);
        assert_eq!(fix.dest, PathBuf::from("libs"));
        assert_eq!(fix.search.len(), 2);
        assert_eq!(fix.exclude, vec![PathBuf::from("/opt/skip")]);
        assert!(fix.force);
        assert!(fix.common.non_interactive);
        assert!(!fix.common.dry_run);
    }

    #[test]
    fn create_version_flag_is_bundle_version() {
        let args = Args::parse_from(["macbundler", "create", "app", "-v", "2.1", "-r", "a", "-r", "b"]);
        let Command::Create(create) = args.command else {
            panic!("expected create");
        };
        assert_eq!(create.version.as_deref(), Some("2.1"));
        assert_eq!(create.resources.len(), 2);
    }

    #[test]
    fn fix_requires_destination() {
        assert!(Args::try_parse_from(["macbundler", "fix", "main"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["macbundler", "sign", "X.app", "--verbose", "--config", "c.toml"]);
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
    }
}
