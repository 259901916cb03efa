//! Archive packager: ZIP backups pairing a database dump with an optional
//! filestore subtree. Layout is `dump.dump` (or `dump.sql` for plain-SQL
//! archives) at the root plus `filestore/<db_name>/...`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::{AppError, Result};

pub const DUMP_ENTRY_CUSTOM: &str = "dump.dump";
pub const DUMP_ENTRY_PLAIN: &str = "dump.sql";
pub const FILESTORE_PREFIX: &str = "filestore";

/// Dump flavor found inside an archive. Backups written by this tool use
/// the custom format; plain SQL archives are accepted on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Custom,
    Plain,
}

/// Contents of an unpacked backup archive.
#[derive(Debug)]
pub struct UnpackedBackup {
    pub dump_path: PathBuf,
    pub dump_kind: DumpKind,
    /// The extracted `filestore/<source_db>` directory, if the archive
    /// carried one. Its name is the *source* database name.
    pub filestore_dir: Option<PathBuf>,
}

/// Archive file name for a backup taken at `at`.
pub fn backup_archive_name(db_name: &str, at: &DateTime<Local>) -> String {
    format!("backup_{}_{}.zip", db_name, at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Writes a backup ZIP containing the dump and, when given, the filestore
/// tree of `db_name` under `filestore/<db_name>/`.
pub fn pack_backup(
    dump_path: &Path,
    filestore_dir: Option<&Path>,
    db_name: &str,
    out_path: &Path,
) -> Result<PathBuf> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AppError::Filesystem {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let archive_file = File::create(out_path).map_err(|e| AppError::Filesystem {
        path: out_path.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(archive_file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    zip.start_file(DUMP_ENTRY_CUSTOM, options)?;
    let mut dump_file = File::open(dump_path).map_err(|e| AppError::Filesystem {
        path: dump_path.to_path_buf(),
        source: e,
    })?;
    io::copy(&mut dump_file, &mut zip)?;

    if let Some(filestore_dir) = filestore_dir {
        for entry in WalkDir::new(filestore_dir) {
            let entry = entry.map_err(|e| AppError::Filesystem {
                path: filestore_dir.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let rel = path
                .strip_prefix(filestore_dir)
                .expect("walkdir yields paths under its root");
            let entry_name = format!(
                "{}/{}/{}",
                FILESTORE_PREFIX,
                db_name,
                rel.to_string_lossy()
            );
            zip.start_file(entry_name, options)?;
            let mut f = File::open(path).map_err(|e| AppError::Filesystem {
                path: path.to_path_buf(),
                source: e,
            })?;
            io::copy(&mut f, &mut zip)?;
        }
    }

    zip.finish()?;
    info!("✓ Backup archive written to {}", out_path.display());
    Ok(out_path.to_path_buf())
}

/// Full-archive integrity check: every entry must be readable with a valid
/// checksum, and a dump entry must be present. Runs before any extraction
/// so a corrupt archive aborts the restore without mutating anything.
pub fn validate_archive(archive_path: &Path) -> Result<()> {
    let corrupt = |reason: String| AppError::CorruptArchive {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| corrupt(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;

    let mut has_dump = false;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| corrupt(format!("entry {}: {}", index, e)))?;
        if entry.name() == DUMP_ENTRY_CUSTOM || entry.name() == DUMP_ENTRY_PLAIN {
            has_dump = true;
        }
        // Reading an entry to EOF verifies its CRC.
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| corrupt(format!("entry '{}': {}", name, e)))?;
    }

    if !has_dump {
        return Err(corrupt(format!(
            "archive contains neither {} nor {}",
            DUMP_ENTRY_CUSTOM, DUMP_ENTRY_PLAIN
        )));
    }
    Ok(())
}

/// Extracts the archive into `work_dir` and locates the dump file and the
/// filestore subtree for the database and filestore executors to consume.
pub fn unpack_archive(archive_path: &Path, work_dir: &Path) -> Result<UnpackedBackup> {
    let corrupt = |reason: String| AppError::CorruptArchive {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| corrupt(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
    archive
        .extract(work_dir)
        .map_err(|e| corrupt(e.to_string()))?;

    let (dump_path, dump_kind) = if work_dir.join(DUMP_ENTRY_CUSTOM).is_file() {
        (work_dir.join(DUMP_ENTRY_CUSTOM), DumpKind::Custom)
    } else if work_dir.join(DUMP_ENTRY_PLAIN).is_file() {
        (work_dir.join(DUMP_ENTRY_PLAIN), DumpKind::Plain)
    } else {
        return Err(corrupt(format!(
            "archive contains neither {} nor {}",
            DUMP_ENTRY_CUSTOM, DUMP_ENTRY_PLAIN
        )));
    };

    // The filestore subtree keeps whatever database name the archive was
    // taken from; the restore step renames it to the target.
    let filestore_base = work_dir.join(FILESTORE_PREFIX);
    let mut filestore_dir = None;
    if filestore_base.is_dir() {
        for entry in std::fs::read_dir(&filestore_base).map_err(|e| AppError::Filesystem {
            path: filestore_base.clone(),
            source: e,
        })? {
            let entry = entry.map_err(|e| AppError::Filesystem {
                path: filestore_base.clone(),
                source: e,
            })?;
            if entry.path().is_dir() {
                filestore_dir = Some(entry.path());
                break;
            }
        }
    }

    Ok(UnpackedBackup {
        dump_path,
        dump_kind,
        filestore_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use std::io::{Read, Write};

    fn write_file(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = File::create(path).unwrap();
        f.write_all(contents).unwrap();
    }

    fn sample_backup(dir: &Path) -> (PathBuf, PathBuf) {
        let dump = dir.join("dump.dump");
        write_file(&dump, b"PGDMP fake custom dump contents");
        let filestore = dir.join("filestore_src").join("sales_db");
        write_file(&filestore.join("a0").join("a0ff01"), b"attachment one");
        write_file(&filestore.join("b1").join("b1cc02"), b"attachment two");
        (dump, filestore)
    }

    #[test]
    fn test_backup_archive_name_format() {
        let at = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            backup_archive_name("sales_db", &at),
            "backup_sales_db_2026-01-02_03-04-05.zip"
        );
    }

    #[test]
    fn test_pack_validate_unpack_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (dump, filestore) = sample_backup(dir.path());
        let out = dir.path().join("backup_sales_db_2026-01-01_00-00-00.zip");

        pack_backup(&dump, Some(&filestore), "sales_db", &out)?;
        validate_archive(&out)?;

        let work = tempfile::tempdir()?;
        let unpacked = unpack_archive(&out, work.path())?;
        assert_eq!(unpacked.dump_kind, DumpKind::Custom);
        assert_eq!(fs::read(&unpacked.dump_path)?, fs::read(&dump)?);

        let fs_dir = unpacked.filestore_dir.expect("filestore in archive");
        assert_eq!(fs_dir.file_name().unwrap(), "sales_db");
        assert_eq!(fs::read(fs_dir.join("a0/a0ff01"))?, b"attachment one");
        assert_eq!(fs::read(fs_dir.join("b1/b1cc02"))?, b"attachment two");
        Ok(())
    }

    #[test]
    fn test_pack_without_filestore() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (dump, _) = sample_backup(dir.path());
        let out = dir.path().join("backup_sales_db_2026-01-01_00-00-00.zip");

        pack_backup(&dump, None, "sales_db", &out)?;
        validate_archive(&out)?;

        let work = tempfile::tempdir()?;
        let unpacked = unpack_archive(&out, work.path())?;
        assert!(unpacked.filestore_dir.is_none());
        Ok(())
    }

    #[test]
    fn test_validate_rejects_truncated_archive() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (dump, filestore) = sample_backup(dir.path());
        let out = dir.path().join("backup_sales_db_2026-01-01_00-00-00.zip");
        pack_backup(&dump, Some(&filestore), "sales_db", &out)?;

        let bytes = fs::read(&out)?;
        fs::write(&out, &bytes[..bytes.len() / 2])?;

        let err = validate_archive(&out).unwrap_err();
        assert!(matches!(err, AppError::CorruptArchive { .. }), "got: {err}");
        Ok(())
    }

    #[test]
    fn test_validate_rejects_archive_without_dump_entry() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("not_a_backup.zip");
        let mut zip = ZipWriter::new(File::create(&out)?);
        zip.start_file("other.txt", FileOptions::default())?;
        zip.write_all(b"hello")?;
        zip.finish()?;

        let err = validate_archive(&out).unwrap_err();
        assert!(matches!(err, AppError::CorruptArchive { .. }), "got: {err}");
        Ok(())
    }

    #[test]
    fn test_unpack_accepts_plain_sql_dump() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("backup_old_2025-01-01_00-00-00.zip");
        let mut zip = ZipWriter::new(File::create(&out)?);
        zip.start_file(DUMP_ENTRY_PLAIN, FileOptions::default())?;
        zip.write_all(b"CREATE TABLE res_partner (id serial);")?;
        zip.finish()?;

        validate_archive(&out)?;
        let work = tempfile::tempdir()?;
        let unpacked = unpack_archive(&out, work.path())?;
        assert_eq!(unpacked.dump_kind, DumpKind::Plain);
        assert!(unpacked.dump_path.ends_with(DUMP_ENTRY_PLAIN));
        Ok(())
    }

    /// Reading a file larger than the test `Read` buffer exercises the
    /// streaming path through `io::copy`.
    #[test]
    fn test_round_trip_preserves_large_dump_bytes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let dump = dir.path().join("dump.dump");
        let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
        write_file(&dump, &payload);
        let out = dir.path().join("backup_big_2026-01-01_00-00-00.zip");

        pack_backup(&dump, None, "big", &out)?;
        let work = tempfile::tempdir()?;
        let unpacked = unpack_archive(&out, work.path())?;
        let mut restored = Vec::new();
        File::open(unpacked.dump_path)?.read_to_end(&mut restored)?;
        assert_eq!(restored, payload);
        Ok(())
    }
}
