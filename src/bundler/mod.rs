//! macOS application bundling.
//!
//! Turns a compiled executable into a self-contained `.app` bundle, signs it
//! and packages it into a notarized disk image.
//!
//! # Overview
//!
//! - [`settings`] - typed configuration and [`SettingsBuilder`]
//! - [`platform::macos::dylib`] - dependency collection and load-command rewriting
//! - [`platform::macos::app`] - bundle scaffolding
//! - [`platform::macos::sign`] - recursive code signing
//! - [`platform::macos::dmg`] - disk image creation, notarization and stapling
//! - [`Bundler`] - orchestrates the above and reports [`BundledArtifact`]s

pub mod builder;
pub mod error;
pub mod platform;
pub mod settings;
pub mod utils;

pub use builder::Bundler;
pub use error::{Error, Result};
pub use platform::PackageType;
pub use settings::{
    BundleSettings, DmgSettings, DylibSettings, MacOsSettings, PackageSettings, Settings,
    SettingsBuilder,
};

use std::path::PathBuf;

/// A produced bundle or disk image.
#[derive(Debug, Clone)]
pub struct BundledArtifact {
    pub package_type: PackageType,
    pub paths: Vec<PathBuf>,
    /// Total size in bytes. Directories count every file they contain.
    pub size: u64,
    /// Hex-encoded SHA-256 of the first path.
    pub checksum: String,
}
