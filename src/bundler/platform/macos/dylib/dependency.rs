//! A single library that will be copied into the bundle.

use crate::bundler::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// One unique library, identified by its file name.
///
/// Every raw reference that resolved to this library is kept as an alias so
/// each of them can be rewritten in the binaries that carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    filename: String,
    prefix: PathBuf,
    aliases: Vec<String>,
    new_name: String,
}

impl Dependency {
    /// Creates a record for the library at the resolved path `real_path`.
    pub fn new(real_path: &Path) -> Result<Self> {
        let filename = real_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::GenericError(format!(
                    "library path has no file name: {}",
                    real_path.display()
                ))
            })?;
        let prefix = real_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            new_name: filename.clone(),
            filename,
            prefix,
            aliases: Vec::new(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Directory the library was found in.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name of the copy inside the bundle.
    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    /// Records another raw reference to this library.
    pub fn add_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }

    /// Location of the library outside the bundle.
    pub fn original_path(&self) -> PathBuf {
        self.prefix.join(&self.filename)
    }

    /// Location of the copy in the destination directory.
    pub fn install_path(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(&self.new_name)
    }

    /// Reference written into binaries that load the bundled copy.
    pub fn inner_path(&self, inside_lib_path: &str) -> String {
        format!("{inside_lib_path}{}", self.new_name)
    }

    /// Every string that may appear in a load command for this library.
    pub fn references(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.original_path().to_string_lossy().into_owned())
            .chain(self.aliases.iter().cloned())
    }

    /// Absorbs `other` if both describe the same library.
    ///
    /// Every reference of `other`, including its own location when that
    /// differs, becomes an alias of `self`. Returns `false` and leaves `self`
    /// untouched when the file names differ.
    pub fn merge_if_same(&mut self, other: &Dependency) -> bool {
        if self.filename != other.filename {
            return false;
        }
        let own = self.original_path().to_string_lossy().into_owned();
        for reference in other.references() {
            if reference != own {
                self.add_alias(reference);
            }
        }
        true
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.filename, self.prefix.display())?;
        for alias in &self.aliases {
            write!(f, "\n    alias: {alias}")?;
        }
        Ok(())
    }
}
