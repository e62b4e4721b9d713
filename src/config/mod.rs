//! `.macbundler.toml` configuration file.
//!
//! The file supplies defaults for the subcommands; flags and environment
//! variables given on the command line take precedence.
//!
//! ```toml
//! [create]
//! version = "1.2"
//! id = "com.example"
//! extension = ".app"
//! icon = "assets/app.icns"
//! min_system_version = "11.0"
//!
//! [fix]
//! prefix = "@executable_path/../libs/"
//! search = ["/opt/homebrew/lib"]
//! exclude = ["/opt/vendor/lib"]
//!
//! [sign]
//! dev_id = "Jane Doe (ABCDE12345)"
//! entitlements = "entitlements.plist"
//!
//! [package]
//! dev_id = "Jane Doe (ABCDE12345)"
//! keychain_profile = "notary"
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use crate::bundler::{Error, Result, error::ErrorExt};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File names looked up in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".macbundler.toml", "macbundler.toml"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub create: CreateConfig,
    pub fix: FixConfig,
    pub sign: SignConfig,
    pub package: PackageConfig,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CreateConfig {
    pub version: Option<String>,
    pub id: Option<String>,
    pub extension: Option<String>,
    pub icon: Option<PathBuf>,
    pub min_system_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FixConfig {
    /// Inner library prefix.
    pub prefix: Option<String>,
    /// Extra library search directories.
    pub search: Vec<PathBuf>,
    /// Prefixes never bundled.
    pub exclude: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SignConfig {
    pub dev_id: Option<String>,
    pub entitlements: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    pub dev_id: Option<String>,
    pub keychain_profile: Option<String>,
    pub entitlements: Option<PathBuf>,
}

fn rebase(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

impl Config {
    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationError`] for invalid TOML or unknown keys.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).fs_context("failed to read config file", path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            Error::ConfigurationError(format!("invalid config file {}: {}", path.display(), e))
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let optional = [
            &mut self.create.icon,
            &mut self.sign.entitlements,
            &mut self.package.entitlements,
        ];
        for path in optional.into_iter().flatten() {
            rebase(base, path);
        }
        for path in self.fix.search.iter_mut().chain(self.fix.exclude.iter_mut()) {
            rebase(base, path);
        }
    }

    /// Candidate locations without an explicit path, in lookup order.
    pub fn candidates(cwd: &Path, config_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|n| cwd.join(n)).collect();
        if let Some(dir) = config_dir {
            paths.push(dir.join("macbundler").join("config.toml"));
        }
        paths
    }

    /// Loads `explicit` if given, otherwise the first existing candidate.
    /// Without any file the defaults are returned.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigurationError`] if `explicit` does not exist or a file is invalid.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().fs_context("failed to read working directory", ".")?;
        Self::discover_in(explicit, &cwd, dirs::config_dir().as_deref())
    }

    pub fn discover_in(explicit: Option<&Path>, cwd: &Path, config_dir: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Error::ConfigurationError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load(path);
        }

        match Self::candidates(cwd, config_dir)
            .into_iter()
            .find(|p| p.is_file())
        {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".macbundler.toml");
        std::fs::write(
            &path,
            r#"
[create]
version = "2.0"
id = "com.example"
icon = "app.icns"

[fix]
prefix = "@rpath/"
search = ["/opt/lib", "vendor"]
exclude = ["/opt/skip"]

[sign]
dev_id = "Jane Doe"

[package]
keychain_profile = "notary"
entitlements = "/abs/ent.plist"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.create.version.as_deref(), Some("2.0"));
        assert_eq!(config.create.id.as_deref(), Some("com.example"));
        assert_eq!(config.create.icon, Some(dir.path().join("app.icns")));
        assert_eq!(config.fix.prefix.as_deref(), Some("@rpath/"));
        assert_eq!(
            config.fix.search,
            vec![PathBuf::from("/opt/lib"), dir.path().join("vendor")]
        );
        assert_eq!(config.fix.exclude, vec![PathBuf::from("/opt/skip")]);
        assert_eq!(config.sign.dev_id.as_deref(), Some("Jane Doe"));
        assert_eq!(config.package.keychain_profile.as_deref(), Some("notary"));
        assert_eq!(config.package.entitlements, Some(PathBuf::from("/abs/ent.plist")));
    }

    #[test]
    fn unknown_key_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macbundler.toml");
        std::fs::write(&path, "[fix]\nprefixes = 1\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn dotfile_wins_over_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".macbundler.toml"), "[create]\nid = \"dot\"\n").unwrap();
        std::fs::write(dir.path().join("macbundler.toml"), "[create]\nid = \"plain\"\n").unwrap();

        let config = Config::discover_in(None, dir.path(), None).unwrap();
        assert_eq!(config.create.id.as_deref(), Some("dot"));
    }

    #[test]
    fn user_config_dir_is_last_resort() {
        let cwd = tempfile::tempdir().unwrap();
        let conf = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(conf.path().join("macbundler")).unwrap();
        std::fs::write(
            conf.path().join("macbundler/config.toml"),
            "[sign]\ndev_id = \"User\"\n",
        )
        .unwrap();

        let config = Config::discover_in(None, cwd.path(), Some(conf.path())).unwrap();
        assert_eq!(config.sign.dev_id.as_deref(), Some("User"));
    }

    #[test]
    fn no_file_gives_defaults() {
        let cwd = tempfile::tempdir().unwrap();
        let config = Config::discover_in(None, cwd.path(), None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn explicit_missing_file_fails() {
        let cwd = tempfile::tempdir().unwrap();
        let err = Config::discover_in(Some(&cwd.path().join("nope.toml")), cwd.path(), None)
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }
}
