//! File system utilities for bundling.
//!
//! Provides file validation before anything is copied into a bundle,
//! destination directory preparation, and recursive copies that preserve
//! symlinks.

use crate::bundler::error::{Error, ErrorExt, Result};
use goblin::mach::{
    fat::{FAT_CIGAM, FAT_MAGIC},
    header::{MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64},
};
use std::{
    io::{self, Read},
    path::Path,
};
use tokio::fs;

/// Maximum file size accepted by [`validate_file`] (1 GiB).
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Checks performed by [`validate_file`] in addition to the basic ones.
#[derive(Debug, Clone, Copy)]
pub struct ValidationOptions {
    /// Require the executable permission bit.
    pub check_executable: bool,
    /// Require a Mach-O (thin or universal) magic number.
    pub check_macho: bool,
    /// Upper bound on the file size in bytes.
    pub max_size: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_executable: false,
            check_macho: false,
            max_size: MAX_FILE_SIZE,
        }
    }
}

impl ValidationOptions {
    /// Options for a dependency about to be copied into a bundle.
    pub fn library() -> Self {
        Self {
            check_macho: true,
            ..Self::default()
        }
    }

    /// Options for a target executable.
    pub fn executable() -> Self {
        Self {
            check_executable: true,
            check_macho: true,
            ..Self::default()
        }
    }
}

fn is_macho_magic(magic: [u8; 4]) -> bool {
    let value = u32::from_be_bytes(magic);
    [MH_MAGIC, MH_CIGAM, MH_MAGIC_64, MH_CIGAM_64, FAT_MAGIC, FAT_CIGAM].contains(&value)
}

fn read_magic(path: &Path) -> io::Result<[u8; 4]> {
    let mut magic = [0u8; 4];
    std::fs::File::open(path)?.read_exact(&mut magic)?;
    Ok(magic)
}

/// Validates a file before it is copied into a bundle or signed.
///
/// The path itself must be a readable, non-empty regular file (not a symlink)
/// no larger than `options.max_size`.
pub fn validate_file(path: &Path, options: &ValidationOptions) -> Result<()> {
    let invalid = |reason: &str| Err(Error::ValidationError(format!("{reason}: {}", path.display())));

    let link_meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return invalid("File does not exist"),
    };
    if link_meta.file_type().is_symlink() {
        return invalid("File is a symbolic link");
    }
    if !link_meta.is_file() {
        return invalid("Path is not a regular file");
    }
    if std::fs::File::open(path).is_err() {
        return invalid("File is not readable");
    }

    let size = link_meta.len();
    if size == 0 {
        return invalid("File is empty (zero bytes)");
    }
    if size > options.max_size {
        return Err(Error::ValidationError(format!(
            "File exceeds maximum size ({size} > {} bytes): {}",
            options.max_size,
            path.display()
        )));
    }

    if options.check_executable && !is_executable(&link_meta) {
        return invalid("File is not executable");
    }

    if options.check_macho {
        match read_magic(path) {
            Ok(magic) if is_macho_magic(magic) => {}
            _ => return invalid("File is not a valid Mach-O binary"),
        }
    }

    Ok(())
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Adds the owner write bit so copied read-only libraries can be edited in place.
#[cfg(unix)]
pub fn make_writable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .fs_context("failed to read permissions of", path)?
        .permissions();
    if perms.mode() & 0o200 == 0 {
        perms.set_mode(perms.mode() | 0o200);
        std::fs::set_permissions(path, perms).fs_context("failed to make writable", path)?;
    }
    Ok(())
}

/// Adds the owner write bit so copied read-only libraries can be edited in place.
#[cfg(not(unix))]
pub fn make_writable(path: &Path) -> Result<()> {
    let mut perms = std::fs::metadata(path)
        .fs_context("failed to read permissions of", path)?
        .permissions();
    perms.set_readonly(false);
    std::fs::set_permissions(path, perms).fs_context("failed to make writable", path)
}

/// Adds the executable bits for owner, group and others.
#[cfg(unix)]
pub async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .await
        .fs_context("failed to read permissions of", path)?
        .permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
        .await
        .fs_context("failed to set permissions of", path)
}

/// Adds the executable bits for owner, group and others.
#[cfg(not(unix))]
pub async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Prepares the directory that bundled libraries are copied into.
///
/// An existing directory is erased and recreated when `overwrite` is set. A
/// missing directory is created only when `create` is set.
pub fn prepare_destination(dest_dir: &Path, overwrite: bool, create: bool) -> Result<()> {
    log::info!("Checking output directory {}", dest_dir.display());

    let mut exists = dest_dir.exists();

    if exists && !dest_dir.is_dir() {
        return Err(Error::DestinationUnavailable {
            path: dest_dir.to_path_buf(),
            reason: "path exists and is not a directory".into(),
        });
    }

    if exists && overwrite {
        log::info!("Erasing old output directory {}", dest_dir.display());
        std::fs::remove_dir_all(dest_dir)
            .fs_context("failed to overwrite destination directory", dest_dir)?;
        exists = false;
    }

    if !exists {
        if !create {
            return Err(Error::DestinationUnavailable {
                path: dest_dir.to_path_buf(),
                reason: "directory does not exist and creation is disabled".into(),
            });
        }
        log::info!("Creating output directory {}", dest_dir.display());
        std::fs::create_dir_all(dest_dir)
            .fs_context("failed to create destination directory", dest_dir)?;
    }

    Ok(())
}

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        // Try removal, ignore NotFound (idempotent)
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).fs_context("failed to remove directory", path),
        }
    }

    fs::create_dir_all(path)
        .await
        .fs_context("failed to create directory", path)
}

/// Makes a symbolic link to a directory.
#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a directory.
#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link to a file.
#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::FileError(format!("{} does not exist", from.display())));
    }
    if !from.is_file() {
        return Err(Error::FileError(format!("{} is not a file", from.display())));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("failed to create directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("failed to copy", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them.
/// Fails if the source path is not a directory or doesn't exist.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::FileError(format!("{} does not exist", from.display())));
    }
    if !from.is_dir() {
        return Err(Error::FileError(format!("{} is not a directory", from.display())));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    // Offload blocking work to dedicated thread pool
    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("failed to create directory", parent)?;
        }

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry.map_err(|e| Error::FileError(e.to_string()))?;
            debug_assert!(entry.path().starts_with(&from));
            let rel_path = entry
                .path()
                .strip_prefix(&from)
                .map_err(|e| Error::FileError(e.to_string()))?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("failed to read symlink", entry.path())?;
                if entry.path().is_dir() {
                    symlink_dir(&target, &dest_path)
                } else {
                    symlink_file(&target, &dest_path)
                }
                .fs_context("failed to create symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .fs_context("failed to create directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("failed to copy", entry.path())?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}
