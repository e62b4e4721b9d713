//! Maps raw library references to files on disk.
//!
//! A reference is either a plain path or starts with `@rpath`/`@loader_path`.
//! Plain paths are canonicalized. Tokens are expanded against the run paths
//! declared by the referencing file, then the referencing file's directory,
//! then the search path list. Whatever is still unresolved goes to an
//! [`UnresolvedHandler`], which either asks the operator or fails.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const RPATH_TOKEN: &str = "@rpath";
pub const LOADER_PATH_TOKEN: &str = "@loader_path";
pub const EXECUTABLE_PATH_TOKEN: &str = "@executable_path";

/// Environment variables whose directories seed an empty search path list.
const FALLBACK_ENV_VARS: &[&str] = &[
    "DYLD_LIBRARY_PATH",
    "DYLD_FALLBACK_FRAMEWORK_PATH",
    "DYLD_FALLBACK_LIBRARY_PATH",
];

/// Returns `true` for references that must be expanded against run paths.
pub fn is_run_path_relative(reference: &str) -> bool {
    reference.starts_with(RPATH_TOKEN) || reference.starts_with(LOADER_PATH_TOKEN)
}

/// Strips the leading `@token/` from a reference.
fn strip_token(reference: &str) -> &str {
    match reference.find('/') {
        Some(idx) if reference.starts_with('@') => &reference[idx + 1..],
        _ => reference,
    }
}

/// What the handler is asked to locate.
#[derive(Debug)]
pub struct LocateRequest<'a> {
    /// Library path relative to the directory being asked for.
    pub filename: &'a str,
    /// The raw reference being resolved.
    pub reference: &'a str,
    pub referencing_file: &'a Path,
}

/// Last resort for references nothing else could resolve.
pub trait UnresolvedHandler {
    /// Returns a directory containing `request.filename`.
    fn locate(&mut self, request: &LocateRequest<'_>) -> Result<PathBuf>;
}

/// Fails immediately. Used for unattended runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl UnresolvedHandler for NonInteractive {
    fn locate(&mut self, request: &LocateRequest<'_>) -> Result<PathBuf> {
        Err(Error::FileNotResolvable {
            reference: request.reference.to_string(),
            referencing_file: request.referencing_file.to_path_buf(),
        })
    }
}

/// Asks the operator for the directory holding a library.
///
/// Keeps asking until the entered directory contains the file. Typing `quit`
/// or closing the input aborts the run.
pub struct InteractivePrompt {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl InteractivePrompt {
    /// Prompt reading from stdin and writing to stderr.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }

    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }
}

impl UnresolvedHandler for InteractivePrompt {
    fn locate(&mut self, request: &LocateRequest<'_>) -> Result<PathBuf> {
        loop {
            write!(
                self.output,
                "\nPlease specify the directory where this library is located (or enter 'quit' to abort): {}\n> ",
                request.filename
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(Error::UserAborted(request.reference.to_string()));
            }
            let answer = line.trim();
            if answer == "quit" {
                return Err(Error::UserAborted(request.reference.to_string()));
            }

            let dir = PathBuf::from(answer);
            if dir.join(request.filename).exists() {
                log::info!("{} was found at {}", request.filename, dir.display());
                return Ok(dir);
            }
            writeln!(self.output, "{answer}/{} does not exist. Try again", request.filename)?;
        }
    }
}

/// Resolution state for one bundling run.
pub struct PathResolver {
    search_paths: Vec<PathBuf>,
    env_seeded: bool,
    rpath_cache: HashMap<String, PathBuf>,
    rpaths_per_file: HashMap<PathBuf, Vec<String>>,
    executable_dir: Option<PathBuf>,
    handler: Box<dyn UnresolvedHandler + Send>,
}

impl PathResolver {
    pub fn new(handler: Box<dyn UnresolvedHandler + Send>) -> Self {
        Self {
            search_paths: Vec::new(),
            env_seeded: false,
            rpath_cache: HashMap::new(),
            rpaths_per_file: HashMap::new(),
            executable_dir: None,
            handler,
        }
    }

    /// Adds a directory to search for unresolved libraries.
    ///
    /// Directories containing `*` are expanded to every matching directory.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let pattern = path.to_string_lossy();
        if pattern.contains('*') {
            match glob::glob(&pattern) {
                Ok(entries) => {
                    for entry in entries.flatten().filter(|e| e.is_dir()) {
                        self.push_search_path(entry);
                    }
                }
                Err(e) => log::warn!("Invalid search path pattern {}: {}", pattern, e),
            }
            return;
        }
        self.push_search_path(path);
    }

    fn push_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Sets the directory `@executable_path` expands to.
    pub fn set_executable_dir(&mut self, dir: impl Into<PathBuf>) {
        self.executable_dir = Some(dir.into());
    }

    /// Stores the run paths declared by `file`. Later calls for the same file are ignored.
    pub fn record_rpaths(&mut self, file: &Path, rpaths: Vec<String>) {
        self.rpaths_per_file
            .entry(file.to_path_buf())
            .or_insert(rpaths);
    }

    pub fn rpaths_for(&self, file: &Path) -> &[String] {
        self.rpaths_per_file
            .get(file)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Seeds an empty search path list from the dyld environment variables.
    fn seed_from_env(&mut self) {
        if self.env_seeded || !self.search_paths.is_empty() {
            return;
        }
        self.env_seeded = true;
        for var in FALLBACK_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                for dir in value.split(':').filter(|d| !d.is_empty()) {
                    log::debug!("Adding search path {} from {}", dir, var);
                    self.add_search_path(dir);
                }
            }
        }
    }

    /// Finds `filename` in the search path list.
    pub fn find_in_search_paths(&mut self, filename: &str) -> Option<PathBuf> {
        self.seed_from_env();
        self.search_paths
            .iter()
            .map(|dir| dir.join(filename))
            .find_map(|candidate| std::fs::canonicalize(candidate).ok())
    }

    /// Expands a declared run path into a directory.
    fn expand_rpath(&self, rpath: &str, loader_dir: &Path) -> PathBuf {
        if let Some(rest) = rpath.strip_prefix(LOADER_PATH_TOKEN) {
            loader_dir.join(rest.trim_start_matches('/'))
        } else if let Some(rest) = rpath.strip_prefix(EXECUTABLE_PATH_TOKEN) {
            self.executable_dir
                .as_deref()
                .unwrap_or(loader_dir)
                .join(rest.trim_start_matches('/'))
        } else {
            PathBuf::from(rpath)
        }
    }

    /// Resolves `reference`, found in `referencing_file`, to a real file.
    pub fn resolve(&mut self, reference: &str, referencing_file: &Path) -> Result<PathBuf> {
        if is_run_path_relative(reference) {
            return self.resolve_token(reference, referencing_file);
        }

        if let Ok(real) = std::fs::canonicalize(reference) {
            return Ok(real);
        }

        let filename = Path::new(reference)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| reference.to_string());
        if let Some(found) = self.find_in_search_paths(&filename) {
            return Ok(found);
        }

        log::warn!("{} not found, referenced by {}", reference, referencing_file.display());
        self.ask_handler(&filename, reference, referencing_file)
    }

    fn resolve_token(&mut self, reference: &str, referencing_file: &Path) -> Result<PathBuf> {
        if let Some(cached) = self.rpath_cache.get(reference) {
            return Ok(cached.clone());
        }

        let suffix = strip_token(reference);
        let loader_dir = referencing_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut candidates = Vec::new();
        if reference.starts_with(LOADER_PATH_TOKEN) {
            candidates.push(loader_dir.join(suffix));
        } else {
            for rpath in self.rpaths_for(referencing_file) {
                candidates.push(self.expand_rpath(rpath, &loader_dir).join(suffix));
            }
            candidates.push(loader_dir.join(suffix));
        }

        let resolved = match candidates
            .iter()
            .find_map(|c| std::fs::canonicalize(c).ok())
        {
            Some(real) => real,
            None => match self.find_in_search_paths(suffix) {
                Some(real) => real,
                None => {
                    log::warn!(
                        "can't get path for '{}' referenced by {}",
                        reference,
                        referencing_file.display()
                    );
                    self.ask_handler(suffix, reference, referencing_file)?
                }
            },
        };

        log::debug!("{} resolved to {}", reference, resolved.display());
        self.rpath_cache
            .insert(reference.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn ask_handler(
        &mut self,
        filename: &str,
        reference: &str,
        referencing_file: &Path,
    ) -> Result<PathBuf> {
        let request = LocateRequest {
            filename,
            reference,
            referencing_file,
        };
        let dir = self.handler.locate(&request)?;
        self.push_search_path(dir.clone());
        let path = dir.join(filename);
        std::fs::canonicalize(&path).fs_context("failed to resolve library", path)
    }
}
