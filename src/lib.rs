//! macOS application bundler.
//!
//! Packages a compiled executable into a self-contained `.app`:
//! - bundles its non-system dylibs into `Contents/libs` and rewrites load
//!   commands to `@executable_path`-relative references
//! - signs the bundle recursively with a Developer ID or ad hoc
//! - packages it into a DMG, notarizes and staples it
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
