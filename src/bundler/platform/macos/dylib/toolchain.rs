//! The external Mach-O tools used to inspect and edit binaries.
//!
//! The dependency engine never spawns processes directly. It talks to a
//! [`Toolchain`], which lets the whole collect/rewrite pipeline run against an
//! in-memory fake in tests.

use crate::bundler::{error::Result, utils::command::run_blocking};
use std::ffi::OsStr;
use std::path::Path;

/// Operations the bundler needs from otool, install_name_tool and codesign.
pub trait Toolchain {
    /// Returns the load-command listing of `file` (`otool -l`).
    fn load_commands(&self, file: &Path) -> Result<String>;

    /// Replaces the dependency entry `old` with `new` (`install_name_tool -change`).
    fn change_dependency(&self, file: &Path, old: &str, new: &str) -> Result<()>;

    /// Sets the install name of a library (`install_name_tool -id`).
    fn change_install_id(&self, file: &Path, id: &str) -> Result<()>;

    /// Replaces the run path `old` with `new` (`install_name_tool -rpath`).
    fn change_rpath(&self, file: &Path, old: &str, new: &str) -> Result<()>;

    /// Removes the run path `rpath` (`install_name_tool -delete_rpath`).
    fn delete_rpath(&self, file: &Path, rpath: &str) -> Result<()>;

    /// Applies an ad-hoc signature, preserving existing signing metadata.
    fn codesign_adhoc(&self, file: &Path) -> Result<()>;

    /// Whether the host is Apple Silicon, where unsigned code will not load.
    fn host_is_arm(&self) -> bool {
        std::env::consts::ARCH == "aarch64"
    }
}

/// [`Toolchain`] backed by the Xcode command line tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    fn load_commands(&self, file: &Path) -> Result<String> {
        run_blocking("otool", &[OsStr::new("-l"), file.as_os_str()])
    }

    fn change_dependency(&self, file: &Path, old: &str, new: &str) -> Result<()> {
        run_blocking(
            "install_name_tool",
            &[
                OsStr::new("-change"),
                OsStr::new(old),
                OsStr::new(new),
                file.as_os_str(),
            ],
        )
        .map(drop)
    }

    fn change_install_id(&self, file: &Path, id: &str) -> Result<()> {
        run_blocking(
            "install_name_tool",
            &[OsStr::new("-id"), OsStr::new(id), file.as_os_str()],
        )
        .map(drop)
    }

    fn change_rpath(&self, file: &Path, old: &str, new: &str) -> Result<()> {
        run_blocking(
            "install_name_tool",
            &[
                OsStr::new("-rpath"),
                OsStr::new(old),
                OsStr::new(new),
                file.as_os_str(),
            ],
        )
        .map(drop)
    }

    fn delete_rpath(&self, file: &Path, rpath: &str) -> Result<()> {
        run_blocking(
            "install_name_tool",
            &[OsStr::new("-delete_rpath"), OsStr::new(rpath), file.as_os_str()],
        )
        .map(drop)
    }

    fn codesign_adhoc(&self, file: &Path) -> Result<()> {
        run_blocking(
            "codesign",
            &[
                OsStr::new("--force"),
                OsStr::new("--deep"),
                OsStr::new("--preserve-metadata=entitlements,requirements,flags,runtime"),
                OsStr::new("--sign"),
                OsStr::new("-"),
                file.as_os_str(),
            ],
        )
        .map(drop)
    }
}
