//! Filestore executor: plain copy/relocate/delete of the attachment
//! directory trees living under `<filestore_root>/<db_name>/`. There is no
//! transactional coupling with the database operations; callers sequence
//! the two and accept that they can transiently disagree on failure.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::errors::{AppError, Result};

pub fn filestore_path(filestore_root: &Path, db_name: &str) -> PathBuf {
    filestore_root.join(db_name)
}

/// Recursively copies `src` into `dest`, creating `dest`. Returns the
/// number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    let mut copied = 0u64;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| AppError::Filesystem {
            path: src.to_path_buf(),
            source: e.into(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        let target = dest.join(rel);
        if entry.path().is_dir() {
            fs::create_dir_all(&target).map_err(|e| AppError::Filesystem {
                path: target.clone(),
                source: e,
            })?;
        } else if entry.path().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| AppError::Filesystem {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            fs::copy(entry.path(), &target).map_err(|e| AppError::Filesystem {
                path: target.clone(),
                source: e,
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Places an extracted filestore tree under the *target* database name,
/// replacing any existing tree. The extracted directory keeps the archive's
/// internal (source) database name; this is where the rename happens.
pub fn install_filestore(
    extracted_dir: &Path,
    filestore_root: &Path,
    target_db: &str,
) -> Result<PathBuf> {
    let target = filestore_path(filestore_root, target_db);
    if target.exists() {
        info!("Replacing existing filestore at {}", target.display());
        fs::remove_dir_all(&target).map_err(|e| AppError::Filesystem {
            path: target.clone(),
            source: e,
        })?;
    }
    let copied = copy_tree(extracted_dir, &target)?;
    info!(
        "✓ Filestore restored to {} ({} files)",
        target.display(),
        copied
    );
    Ok(target)
}

/// Copies the filestore of `source_db` to `target_db`, replacing any
/// existing target tree. Returns false (after a warning) when the source
/// tree does not exist.
pub fn duplicate_filestore(
    filestore_root: &Path,
    source_db: &str,
    target_db: &str,
) -> Result<bool> {
    let source = filestore_path(filestore_root, source_db);
    if !source.is_dir() {
        warn!(
            "No filestore found for source database '{}' at {}",
            source_db,
            source.display()
        );
        return Ok(false);
    }
    install_filestore(&source, filestore_root, target_db)?;
    Ok(true)
}

/// Removes the filestore tree of `db_name`. Idempotent: returns false when
/// the tree was already absent.
pub fn delete_filestore(filestore_root: &Path, db_name: &str) -> Result<bool> {
    let path = filestore_path(filestore_root, db_name);
    if !path.exists() {
        warn!(
            "No filestore found for database '{}' at {}",
            db_name,
            path.display()
        );
        return Ok(false);
    }
    fs::remove_dir_all(&path).map_err(|e| AppError::Filesystem {
        path: path.clone(),
        source: e,
    })?;
    info!("Filestore removed for database '{}' at {}", db_name, path.display());
    Ok(true)
}

/// Creates an empty filestore directory for a freshly created database.
pub fn create_filestore(filestore_root: &Path, db_name: &str) -> Result<PathBuf> {
    let path = filestore_path(filestore_root, db_name);
    fs::create_dir_all(&path).map_err(|e| AppError::Filesystem {
        path: path.clone(),
        source: e,
    })?;
    info!(
        "Filestore directory created for database '{}' at {}",
        db_name,
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(contents).unwrap();
    }

    #[test]
    fn test_copy_tree_preserves_structure() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        write_file(&src.join("a0/file1"), b"one");
        write_file(&src.join("a0/deep/file2"), b"two");
        fs::create_dir_all(src.join("empty"))?;

        let dest = dir.path().join("dest");
        let copied = copy_tree(&src, &dest)?;
        assert_eq!(copied, 2);
        assert_eq!(fs::read(dest.join("a0/file1"))?, b"one");
        assert_eq!(fs::read(dest.join("a0/deep/file2"))?, b"two");
        assert!(dest.join("empty").is_dir());
        Ok(())
    }

    #[test]
    fn test_install_filestore_renames_to_target_db() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        // Extracted tree still carries the source database name.
        let extracted = dir.path().join("scratch/filestore/sales_db");
        write_file(&extracted.join("a0/blob"), b"data");

        let root = dir.path().join("filestore_root");
        fs::create_dir_all(&root)?;
        let target = install_filestore(&extracted, &root, "sales_db_copy")?;

        assert_eq!(target, root.join("sales_db_copy"));
        assert!(root.join("sales_db_copy/a0/blob").is_file());
        assert!(!root.join("sales_db").exists());
        Ok(())
    }

    #[test]
    fn test_install_filestore_replaces_existing_tree() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let extracted = dir.path().join("extracted");
        write_file(&extracted.join("new_blob"), b"new");

        let root = dir.path().join("root");
        write_file(&root.join("target_db/stale_blob"), b"stale");

        install_filestore(&extracted, &root, "target_db")?;
        assert!(root.join("target_db/new_blob").is_file());
        assert!(!root.join("target_db/stale_blob").exists());
        Ok(())
    }

    #[test]
    fn test_duplicate_filestore_missing_source_is_not_an_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let copied = duplicate_filestore(dir.path(), "absent_db", "target_db")?;
        assert!(!copied);
        assert!(!dir.path().join("target_db").exists());
        Ok(())
    }

    #[test]
    fn test_delete_filestore_is_idempotent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write_file(&dir.path().join("sales_db/a0/blob"), b"data");

        assert!(delete_filestore(dir.path(), "sales_db")?);
        assert!(!dir.path().join("sales_db").exists());
        assert!(!delete_filestore(dir.path(), "sales_db")?);
        Ok(())
    }

    #[test]
    fn test_create_filestore() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = create_filestore(dir.path(), "fresh_db")?;
        assert!(path.is_dir());
        // Creating again is harmless.
        create_filestore(dir.path(), "fresh_db")?;
        Ok(())
    }
}
