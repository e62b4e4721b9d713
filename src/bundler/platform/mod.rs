//! Platform-specific bundling.

pub mod macos;

use std::fmt;

/// Kind of artifact the [`Bundler`](crate::bundler::Bundler) can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackageType {
    /// `.app` bundle folder.
    MacOsBundle,
    /// Compressed disk image.
    Dmg,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOsBundle => write!(f, "app"),
            Self::Dmg => write!(f, "dmg"),
        }
    }
}
