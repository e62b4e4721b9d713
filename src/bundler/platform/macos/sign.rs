//! Recursive code signing of a bundle.
//!
//! Nested code must be signed before the code that contains it, so the
//! bundle is walked first and signed inside-out:
//!
//! 1. internal binaries (`.so`, `.dylib`) and plugin bundles (`.mxo`, `.bundle`)
//! 2. nested `.app` bundles: their `Contents/MacOS` executables, then the app
//!    with the hardened runtime
//! 3. frameworks
//! 4. the bundle itself with the hardened runtime and entitlements
//!
//! Finally the signature is verified with `codesign --verify`.

use crate::bundler::{
    builder::signing::signing_authority,
    error::{Error, Result},
    settings::MacOsSettings,
    utils::command::run,
};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions of loose binaries that need their own signature.
pub const SIGNABLE_FILE_EXTENSIONS: &[&str] = &["so", "dylib"];

/// Folder extensions of nested code bundles.
pub const SIGNABLE_FOLDER_EXTENSIONS: &[&str] = &["mxo", "framework", "app", "bundle"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

/// Whether `path` names a folder codesign treats as a bundle.
pub fn is_signable_folder(path: &Path) -> bool {
    has_extension(path, SIGNABLE_FOLDER_EXTENSIONS)
}

/// Signable items found inside a bundle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignTargets {
    pub internals: BTreeSet<PathBuf>,
    pub apps: BTreeSet<PathBuf>,
    pub frameworks: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Internal,
    AppExecutable,
    AppRuntime,
    Framework,
    MainRuntime,
}

/// One codesign invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignStep {
    pub kind: StepKind,
    pub path: PathBuf,
}

impl SignStep {
    fn runtime(&self) -> bool {
        matches!(self.kind, StepKind::AppRuntime | StepKind::MainRuntime)
    }
}

impl fmt::Display for SignStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            StepKind::Internal => "internal",
            StepKind::AppExecutable => "app.exe",
            StepKind::AppRuntime => "app.runtime",
            StepKind::Framework => "framework",
            StepKind::MainRuntime => "main.runtime",
        };
        write!(f, "{}: {}", label, self.path.display())
    }
}

/// Signs a bundle and everything nested in it.
#[derive(Debug)]
pub struct Codesigner {
    path: PathBuf,
    authority: Option<String>,
    entitlements: Option<PathBuf>,
    dry_run: bool,
    verify: bool,
}

impl Codesigner {
    /// # Errors
    ///
    /// - [`Error::ValidationError`] for a malformed Developer ID
    /// - [`Error::ConfigurationError`] if the entitlements file does not exist
    pub fn new(path: impl Into<PathBuf>, macos: &MacOsSettings, dry_run: bool) -> Result<Self> {
        let authority = signing_authority(macos.signing_identity.as_deref())?;

        if let Some(entitlements) = &macos.entitlements {
            if !entitlements.exists() {
                return Err(Error::ConfigurationError(format!(
                    "Entitlements file not found: {}",
                    entitlements.display()
                )));
            }
        }

        Ok(Self {
            path: path.into(),
            authority,
            entitlements: macos.entitlements.clone(),
            dry_run,
            verify: !macos.skip_verification,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` means ad-hoc signing.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Walks the bundle and classifies every signable item. Symlinks are skipped.
    pub fn collect(&self) -> SignTargets {
        let mut targets = SignTargets::default();
        let walker = walkdir::WalkDir::new(&self.path)
            .min_depth(1)
            .follow_links(false);

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let file_type = entry.file_type();
            if file_type.is_symlink() {
                continue;
            }
            let path = entry.path();

            if file_type.is_file() && has_extension(path, SIGNABLE_FILE_EXTENSIONS) {
                log::debug!("added binary: {}", path.display());
                targets.internals.insert(path.to_path_buf());
            } else if file_type.is_dir() && is_signable_folder(path) {
                log::debug!("added bundle: {}", path.display());
                match path.extension().and_then(|e| e.to_str()) {
                    Some("framework") => targets.frameworks.insert(path.to_path_buf()),
                    Some("app") => targets.apps.insert(path.to_path_buf()),
                    _ => targets.internals.insert(path.to_path_buf()),
                };
            }
        }
        targets
    }

    /// Orders the signing of `targets`, inside-out.
    pub fn plan(&self, targets: &SignTargets) -> Vec<SignStep> {
        let step = |kind, path: &Path| SignStep {
            kind,
            path: path.to_path_buf(),
        };
        let mut steps: Vec<SignStep> = targets
            .internals
            .iter()
            .map(|p| step(StepKind::Internal, p))
            .collect();

        for app in &targets.apps {
            let macos = app.join("Contents").join("MacOS");
            let mut executables: Vec<PathBuf> = std::fs::read_dir(&macos)
                .into_iter()
                .flatten()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
                .map(|e| e.path())
                .collect();
            executables.sort();
            steps.extend(executables.iter().map(|p| step(StepKind::AppExecutable, p)));
            steps.push(step(StepKind::AppRuntime, app));
        }

        steps.extend(
            targets
                .frameworks
                .iter()
                .map(|p| step(StepKind::Framework, p)),
        );
        steps.push(step(StepKind::MainRuntime, &self.path));
        steps
    }

    /// codesign arguments for one step.
    pub fn sign_args(&self, step: &SignStep) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--sign".into(),
            self.authority.as_deref().unwrap_or("-").into(),
            "--timestamp".into(),
            "--force".into(),
        ];
        if step.runtime() {
            args.push("--options".into());
            args.push("runtime".into());
            if let Some(entitlements) = &self.entitlements {
                args.push("--entitlements".into());
                args.push(entitlements.into());
            }
        }
        args.push(step.path.clone().into());
        args
    }

    /// Signs the bundle and, unless disabled or dry-running, verifies it.
    pub async fn process(&self) -> Result<()> {
        log::info!("Signing {}", self.path.display());
        if !self.path.exists() {
            return Err(Error::FileError(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let targets = self.collect();
        let steps = self.plan(&targets);
        match &self.authority {
            Some(authority) => log::info!("Using identity: {}", authority),
            None => log::info!("Using ad-hoc signature"),
        }

        for step in &steps {
            if self.dry_run {
                log::info!("[DRY RUN] {}", step);
            } else {
                log::info!("signing {}", step);
            }
            run("codesign", &self.sign_args(step), self.dry_run).await?;
        }

        if self.verify && !self.dry_run {
            self.verify_signature(&self.path).await?;
        }

        log::info!("✓ Signed {}", self.path.display());
        Ok(())
    }

    pub async fn verify_signature(&self, path: &Path) -> Result<()> {
        let args = [
            OsString::from("--verify"),
            OsString::from("--verbose"),
            path.as_os_str().to_owned(),
        ];
        run("codesign", &args, false).await.map_err(|e| {
            Error::CodesignError(format!(
                "signature verification failed for {}: {}",
                path.display(),
                e
            ))
        })?;
        log::info!("verified: {}", path.display());
        Ok(())
    }
}
