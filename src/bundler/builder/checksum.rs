//! Artifact checksum calculation.
//!
//! SHA256 of a disk image, or of a whole `.app` folder hashed file by file.

use crate::{bail, bundler::Result, bundler::error::ErrorExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Calculates SHA256 checksum of a file or directory.
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash (64 characters)
/// * `Err` - If path cannot be read or is neither file nor directory
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading metadata for hashing", path)?;

    if metadata.is_file() {
        calculate_file_sha256(path).await
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }
}

async fn hash_file(hasher: &mut Sha256, path: &Path, buffer: &mut [u8]) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    loop {
        let n = file
            .read(buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..n]);
    }
}

async fn calculate_file_sha256(file_path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    hash_file(&mut hasher, file_path, &mut buffer).await?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hashes every regular file under `dir_path` in sorted order, each preceded
/// by its relative path. Symlinks are not followed.
async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(dir_path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by_key(|e| e.path().to_path_buf());

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    for entry in entries {
        if let Ok(rel_path) = entry.path().strip_prefix(dir_path) {
            hasher.update(rel_path.to_string_lossy().as_bytes());
        }
        hash_file(&mut hasher, entry.path(), &mut buffer).await?;
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_checksum_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.dmg");
        std::fs::write(&file, "abc").unwrap();
        assert_eq!(
            calculate_sha256(&file).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn directory_checksum_depends_on_layout() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("A.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(app.join("Contents/MacOS/a"), "bin").unwrap();
        let first = calculate_sha256(&app).await.unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, calculate_sha256(&app).await.unwrap());

        std::fs::rename(app.join("Contents/MacOS/a"), app.join("Contents/MacOS/b")).unwrap();
        assert_ne!(first, calculate_sha256(&app).await.unwrap());
    }

    #[tokio::test]
    async fn missing_path_fails() {
        assert!(calculate_sha256(Path::new("/nonexistent/x.dmg")).await.is_err());
    }
}
