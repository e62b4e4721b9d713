//! Parsing of `otool -l` load-command listings.

use crate::bundler::error::{Error, Result};
use std::path::Path;

/// Load commands that name a library the binary depends on.
const DYLIB_COMMANDS: &[&str] = &[
    "LC_LOAD_DYLIB",
    "LC_LOAD_WEAK_DYLIB",
    "LC_REEXPORT_DYLIB",
    "LC_LOAD_UPWARD_DYLIB",
];

const RPATH_COMMAND: &str = "LC_RPATH";

/// Dependency and run-path entries extracted from one binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadCommands {
    /// Raw library references in declaration order.
    pub dylibs: Vec<String>,
    /// Raw run-path entries in declaration order.
    pub rpaths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    Dylib,
    Rpath,
}

/// Strips the trailing ` (offset N)` annotation from a value line.
fn strip_offset(value: &str) -> String {
    let value = match value.rfind(" (") {
        Some(idx) => &value[..idx],
        None => value,
    };
    value.trim().to_string()
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Extracts library references and run paths from `otool -l` output.
///
/// A dylib command header must be followed by its `name` line before the next
/// command starts. A universal binary lists each architecture separately, so
/// repeated entries are collapsed.
pub fn parse_load_commands(path: &Path, output: &str) -> Result<LoadCommands> {
    let mut commands = LoadCommands::default();
    let mut pending = Pending::Nothing;

    let malformed = |reason: String| Error::MalformedToolOutput {
        path: path.to_path_buf(),
        reason,
    };

    for line in output.lines() {
        let line = line.trim();

        if let Some(cmd) = line.strip_prefix("cmd ") {
            match pending {
                Pending::Dylib => {
                    return Err(malformed(format!(
                        "dependency load command has no name line before `{}`",
                        cmd.trim()
                    )));
                }
                Pending::Rpath => {
                    log::warn!("Unexpected LC_RPATH format in {}", path.display());
                }
                Pending::Nothing => {}
            }

            let cmd = cmd.trim();
            pending = if DYLIB_COMMANDS.contains(&cmd) {
                Pending::Dylib
            } else if cmd == RPATH_COMMAND {
                Pending::Rpath
            } else {
                Pending::Nothing
            };
            continue;
        }

        match pending {
            Pending::Dylib => {
                if let Some(name) = line.strip_prefix("name ") {
                    push_unique(&mut commands.dylibs, strip_offset(name));
                    pending = Pending::Nothing;
                }
            }
            Pending::Rpath => {
                if let Some(rpath) = line.strip_prefix("path ") {
                    push_unique(&mut commands.rpaths, strip_offset(rpath));
                    pending = Pending::Nothing;
                }
            }
            Pending::Nothing => {}
        }
    }

    match pending {
        Pending::Dylib => Err(malformed(
            "output ended inside a dependency load command".into(),
        )),
        Pending::Rpath => {
            log::warn!("Unexpected LC_RPATH format in {}", path.display());
            Ok(commands)
        }
        Pending::Nothing => Ok(commands),
    }
}
