//! Artifact checksum calculation.
//!
//! SHA-256 digests and sizes for the release report. Works on both the
//! signed `.pkg` and the `.app` directory tree.

use crate::{bail, bundler::Result, bundler::error::ErrorExt};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Hex-encoded SHA-256 of a file or a directory tree.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;

    if metadata.is_file() {
        calculate_file_sha256(path).await
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }
}

/// Reads the file in 8KB chunks.
async fn calculate_file_sha256(file_path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(file_path)
        .await
        .fs_context("opening file for hashing", file_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", file_path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Hashes every file's relative path and content in sorted path order, so
/// the digest of an `.app` only changes when its contents do.
async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    let mut entries = bundle_files(dir_path)?;
    entries.sort_by_key(|e| e.path().to_path_buf());

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    for entry in entries {
        if let Ok(rel_path) = entry.path().strip_prefix(dir_path) {
            hasher.update(rel_path.to_string_lossy().as_bytes());
        }

        let mut file = tokio::fs::File::open(entry.path())
            .await
            .fs_context("opening file for hashing", entry.path())?;

        loop {
            let n = file
                .read(&mut buffer)
                .await
                .fs_context("reading file for hash calculation", entry.path())?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn bundle_files(dir_path: &Path) -> Result<Vec<walkdir::DirEntry>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir_path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry);
        }
    }
    Ok(files)
}

/// Total size in bytes of a file, or of every file under a directory.
pub async fn artifact_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    let mut size = 0u64;
    for entry in bundle_files(path)? {
        size += entry.metadata()?.len();
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_digest_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("Demo.app");
        std::fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        std::fs::write(app.join("Contents/Info.plist"), "plist").unwrap();
        std::fs::write(app.join("Contents/MacOS/Demo"), "binary").unwrap();

        let first = calculate_sha256(&app).await.unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, calculate_sha256(&app).await.unwrap());
        assert_eq!(artifact_size(&app).await.unwrap(), 11);

        std::fs::write(app.join("Contents/MacOS/Demo"), "patched").unwrap();
        assert_ne!(first, calculate_sha256(&app).await.unwrap());
    }

    #[tokio::test]
    async fn file_digest_is_plain_sha256() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("Demo.pkg");
        std::fs::write(&pkg, "abc").unwrap();
        assert_eq!(
            calculate_sha256(&pkg).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(artifact_size(&pkg).await.unwrap(), 3);
    }
}
