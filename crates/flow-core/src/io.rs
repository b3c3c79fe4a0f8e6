use crate::error::Result;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A crash mid-write leaves any previous content of `path` intact.
///
/// Existing files keep their permissions. New files are written in place with
/// the process defaults, since there is no prior content to protect.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let existing = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::write(path, data)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().set_permissions(existing.permissions())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a UTF-8 file, returning `None` when it does not exist.
pub fn read_text_if_exists(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Attempts at a free backup name before giving up.
pub const MAX_BACKUP_ATTEMPTS: usize = 10;

/// `<name>.<ISO8601>.bak` next to `path`, with `:` and `.` in the timestamp replaced by `-`.
///
/// `attempt > 0` adds a counter (`<name>.<ISO8601>-<attempt>.bak`) for backups
/// taken within the same millisecond.
pub fn backup_path(path: &Path, at: DateTime<Utc>, attempt: usize) -> PathBuf {
    let stamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if attempt == 0 {
        path.with_file_name(format!("{name}.{stamp}.bak"))
    } else {
        path.with_file_name(format!("{name}.{stamp}-{attempt}.bak"))
    }
}

/// Write `original` (the bytes of `path` as last read) into a fresh backup file.
///
/// Never overwrites an existing backup. The caller must not mutate `path` if
/// this returns an error.
pub fn create_backup(path: &Path, original: &[u8], at: DateTime<Utc>) -> Result<PathBuf> {
    let mut attempt = 0;
    let (dest, mut f) = loop {
        let dest = backup_path(path, at, attempt);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
        {
            Ok(f) => break (dest, f),
            Err(e)
                if e.kind() == std::io::ErrorKind::AlreadyExists
                    && attempt + 1 < MAX_BACKUP_ATTEMPTS =>
            {
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    };
    f.write_all(original)?;
    f.sync_all()?;
    tracing::debug!(backup = %dest.display(), "backup written");
    Ok(dest)
}
