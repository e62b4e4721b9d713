//! Dependency bundling settings.

use std::path::PathBuf;

/// Default reference prefix written into rewritten binaries.
pub const DEFAULT_INSIDE_LIB_PATH: &str = "@executable_path/../libs/";

/// What happens when ad-hoc signing still fails after the retry workaround.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryFailurePolicy {
    /// Fatal on Apple Silicon, where unsigned code is refused; logged elsewhere.
    #[default]
    FatalOnArm,
    /// Always abort the run.
    AlwaysFatal,
    /// Log and continue.
    NeverFatal,
}

impl RetryFailurePolicy {
    pub fn is_fatal(self, host_is_arm: bool) -> bool {
        match self {
            Self::FatalOnArm => host_is_arm,
            Self::AlwaysFatal => true,
            Self::NeverFatal => false,
        }
    }
}

/// Configuration for one dependency bundling run.
///
/// # Configuration
///
/// The `[fix]` section of `.macbundler.toml` fills `inside_lib_path`,
/// `search_paths` and `prefixes_to_ignore`:
///
/// ```toml
/// [fix]
/// prefix = "@executable_path/../libs/"
/// search = ["/opt/homebrew/lib"]
/// exclude = ["/opt/vendor"]
/// ```
#[derive(Clone, Debug)]
pub struct DylibSettings {
    /// Directory the libraries are copied into.
    pub dest_dir: PathBuf,

    /// Erase `dest_dir` first if it exists.
    ///
    /// Default: false
    pub overwrite_dir: bool,

    /// Create `dest_dir` if missing.
    ///
    /// Default: false
    pub create_dir: bool,

    /// Ad-hoc sign every rewritten file.
    ///
    /// Default: true
    pub codesign: bool,

    /// Prefix of the references written into rewritten binaries.
    ///
    /// Default: `@executable_path/../libs/`
    pub inside_lib_path: String,

    /// Executables or plugins whose dependencies are bundled.
    pub files_to_fix: Vec<PathBuf>,

    /// Libraries under these prefixes are left alone.
    pub prefixes_to_ignore: Vec<PathBuf>,

    /// Extra directories to search for libraries. `*` patterns are allowed.
    pub search_paths: Vec<PathBuf>,

    /// Operating system library locations, never bundled.
    ///
    /// Default: `/usr/lib/`, `/System/Library/`
    pub system_prefixes: Vec<String>,

    /// Ask on the terminal when a library cannot be found.
    ///
    /// Default: true
    pub interactive: bool,

    /// Require copied libraries to be Mach-O files.
    ///
    /// Default: true
    pub validate_macho: bool,

    /// Only log what would be done.
    pub dry_run: bool,

    pub signing_retry: RetryFailurePolicy,
}

impl Default for DylibSettings {
    fn default() -> Self {
        Self {
            dest_dir: PathBuf::from("./libs/"),
            overwrite_dir: false,
            create_dir: false,
            codesign: true,
            inside_lib_path: DEFAULT_INSIDE_LIB_PATH.to_string(),
            files_to_fix: Vec::new(),
            prefixes_to_ignore: Vec::new(),
            search_paths: Vec::new(),
            system_prefixes: crate::bundler::platform::macos::dylib::DEFAULT_SYSTEM_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            interactive: true,
            validate_macho: true,
            dry_run: false,
            signing_retry: RetryFailurePolicy::default(),
        }
    }
}

impl DylibSettings {
    /// Settings for bundling the dependencies of `files` into `dest_dir`.
    pub fn new(dest_dir: impl Into<PathBuf>, files: Vec<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            files_to_fix: files,
            ..Self::default()
        }
    }

    /// Normalizes `inside_lib_path` to end with `/`.
    pub fn inner_prefix(&self) -> String {
        if self.inside_lib_path.ends_with('/') {
            self.inside_lib_path.clone()
        } else {
            format!("{}/", self.inside_lib_path)
        }
    }
}
