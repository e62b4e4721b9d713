//! In-memory stand-in for the Xcode tools.
//!
//! Fake binaries are small files holding a Mach-O magic number followed by
//! `id`, `dylib` and `rpath` lines. Because the description lives in the file
//! itself, copies made by the bundler carry it along and edits are visible
//! when the file is read back.

use super::toolchain::Toolchain;
use crate::bundler::error::{Error, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAGIC: &[u8] = b"\xcf\xfa\xed\xfe";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeBinary {
    pub id: Option<String>,
    pub dylibs: Vec<String>,
    pub rpaths: Vec<String>,
}

impl FakeBinary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl AsRef<Path>) -> Self {
        self.id = Some(id.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn dylib(mut self, dylib: impl AsRef<Path>) -> Self {
        self.dylibs
            .push(dylib.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn rpath(mut self, rpath: impl AsRef<Path>) -> Self {
        self.rpaths
            .push(rpath.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut text = String::new();
        if let Some(id) = &self.id {
            text.push_str(&format!("id {id}\n"));
        }
        for dylib in &self.dylibs {
            text.push_str(&format!("dylib {dylib}\n"));
        }
        for rpath in &self.rpaths {
            text.push_str(&format!("rpath {rpath}\n"));
        }
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(text.as_bytes());
        std::fs::write(path, bytes).unwrap();
    }

    pub fn read(path: &Path) -> Self {
        Self::parse(&std::fs::read(path).unwrap())
    }

    fn parse(bytes: &[u8]) -> Self {
        let body = bytes.strip_prefix(MAGIC).unwrap_or(bytes);
        let mut binary = Self::default();
        for line in String::from_utf8_lossy(body).lines() {
            if let Some(id) = line.strip_prefix("id ") {
                binary.id = Some(id.to_string());
            } else if let Some(dylib) = line.strip_prefix("dylib ") {
                binary.dylibs.push(dylib.to_string());
            } else if let Some(rpath) = line.strip_prefix("rpath ") {
                binary.rpaths.push(rpath.to_string());
            }
        }
        binary
    }

    fn render_load_commands(&self, path: &Path) -> String {
        let mut out = format!("{}:\n", path.display());
        let mut n = 0;
        if let Some(id) = &self.id {
            out.push_str(&format!(
                "Load command {n}\n          cmd LC_ID_DYLIB\n      cmdsize 56\n         name {id} (offset 24)\n"
            ));
            n += 1;
        }
        for dylib in &self.dylibs {
            out.push_str(&format!(
                "Load command {n}\n          cmd LC_LOAD_DYLIB\n      cmdsize 56\n         name {dylib} (offset 24)\n   time stamp 2 Thu Jan  1 01:00:02 1970\n"
            ));
            n += 1;
        }
        for rpath in &self.rpaths {
            out.push_str(&format!(
                "Load command {n}\n          cmd LC_RPATH\n      cmdsize 40\n         path {rpath} (offset 12)\n"
            ));
            n += 1;
        }
        out
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<String>,
    sign_failures: usize,
}

/// Records every invocation. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    state: Arc<Mutex<State>>,
    arm: bool,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `failures` signing attempts fail.
    pub fn with_sign_failures(failures: usize, arm: bool) -> Self {
        let toolchain = Self {
            arm,
            ..Self::default()
        };
        toolchain.state.lock().unwrap().sign_failures = failures;
        toolchain
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn edit(&self, file: &Path, command: &str, f: impl FnOnce(&mut FakeBinary) -> bool) -> Result<()> {
        let bytes = std::fs::read(file).map_err(|_| failure(command, file))?;
        let mut binary = FakeBinary::parse(&bytes);
        if !f(&mut binary) {
            return Err(failure(command, file));
        }
        binary.write(file);
        Ok(())
    }
}

fn failure(command: &str, file: &Path) -> Error {
    Error::CommandError {
        command: format!("{command} {}", file.display()),
        code: 1,
        output: Some("fake tool failure".into()),
    }
}

impl Toolchain for FakeToolchain {
    fn load_commands(&self, file: &Path) -> Result<String> {
        self.record(format!("otool {}", file.display()));
        let bytes = std::fs::read(file).map_err(|_| failure("otool -l", file))?;
        Ok(FakeBinary::parse(&bytes).render_load_commands(file))
    }

    fn change_dependency(&self, file: &Path, old: &str, new: &str) -> Result<()> {
        self.record(format!("change {} {old} -> {new}", file.display()));
        self.edit(file, "install_name_tool -change", |binary| {
            for dylib in binary.dylibs.iter_mut().filter(|d| *d == old) {
                *dylib = new.to_string();
            }
            true
        })
    }

    fn change_install_id(&self, file: &Path, id: &str) -> Result<()> {
        self.record(format!("id {} {id}", file.display()));
        self.edit(file, "install_name_tool -id", |binary| {
            binary.id = Some(id.to_string());
            true
        })
    }

    fn change_rpath(&self, file: &Path, old: &str, new: &str) -> Result<()> {
        self.record(format!("rpath {} {old} -> {new}", file.display()));
        self.edit(file, "install_name_tool -rpath", |binary| {
            if binary.rpaths.iter().any(|r| r == new) {
                return false;
            }
            match binary.rpaths.iter_mut().find(|r| *r == old) {
                Some(rpath) => {
                    *rpath = new.to_string();
                    true
                }
                None => false,
            }
        })
    }

    fn delete_rpath(&self, file: &Path, rpath: &str) -> Result<()> {
        self.record(format!("delete_rpath {} {rpath}", file.display()));
        self.edit(file, "install_name_tool -delete_rpath", |binary| {
            let before = binary.rpaths.len();
            binary.rpaths.retain(|r| r != rpath);
            binary.rpaths.len() != before
        })
    }

    fn codesign_adhoc(&self, file: &Path) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if state.sign_failures > 0 {
                state.sign_failures -= 1;
                state.calls.push(format!("sign-failed {}", file.display()));
                return Err(failure("codesign", file));
            }
        }
        if !file.exists() {
            return Err(failure("codesign", file));
        }
        self.record(format!("sign {}", file.display()));
        Ok(())
    }

    fn host_is_arm(&self) -> bool {
        self.arm
    }
}
