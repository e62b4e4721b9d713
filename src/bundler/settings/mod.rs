//! Configuration structures for bundling operations.
//!
//! [`Settings`] drives bundle creation and packaging and is built with
//! [`SettingsBuilder`]. [`DylibSettings`] configures a standalone dependency
//! bundling run.

mod builder;
mod bundle;
mod core;
mod dylib;
mod macos;
mod package;

pub use builder::SettingsBuilder;
pub use bundle::{BundleSettings, DEFAULT_EXTENSION, DEFAULT_IDENTIFIER};
pub use core::Settings;
pub use dylib::{DEFAULT_INSIDE_LIB_PATH, DylibSettings, RetryFailurePolicy};
pub use macos::{DEFAULT_MINIMUM_SYSTEM_VERSION, DmgSettings, MacOsSettings};
pub use package::{DEFAULT_VERSION, PackageSettings};
