//! Additive directory merge-copy.
//!
//! Files present only in the destination are never touched; divergent files
//! are reported as conflicts unless `force` is set.

use crate::error::{FlowError, Result};
use crate::io;
use crate::types::FileOutcome;
use std::path::Path;

pub const REASON_IDENTICAL: &str = "identical content";
pub const REASON_CONFLICT: &str = "file exists with different content, use --force to overwrite";

/// Merge `source` into `dest`, one outcome per source file.
///
/// Entries are visited in file-name order. If the walk fails after some files
/// were reconciled, the error is [`FlowError::CopyInterrupted`] carrying those
/// outcomes.
pub fn merge_copy(source: &Path, dest: &Path, force: bool) -> Result<Vec<FileOutcome>> {
    if !source.exists() {
        return Err(FlowError::NotFound(source.to_path_buf()));
    }
    io::ensure_dir(dest)?;

    let mut outcomes = Vec::new();
    match merge_dir(source, dest, force, &mut outcomes) {
        Ok(()) => Ok(outcomes),
        Err(e) if outcomes.is_empty() => Err(e),
        Err(e) => Err(FlowError::CopyInterrupted {
            outcomes,
            source: Box::new(e),
        }),
    }
}

fn merge_dir(
    source: &Path,
    dest: &Path,
    force: bool,
    outcomes: &mut Vec<FileOutcome>,
) -> Result<()> {
    let mut entries = std::fs::read_dir(source)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        // Follow symlinks so linked asset directories are merged like real ones.
        if std::fs::metadata(&src_path)?.is_dir() {
            io::ensure_dir(&dest_path)?;
            merge_dir(&src_path, &dest_path, force, outcomes)?;
        } else {
            outcomes.push(reconcile_file(&src_path, &dest_path, force)?);
        }
    }
    Ok(())
}

/// Apply the single-file policy: create, skip when identical, otherwise
/// conflict or overwrite depending on `force`.
pub fn reconcile_file(source: &Path, dest: &Path, force: bool) -> Result<FileOutcome> {
    let content = std::fs::read_to_string(source)?;

    let existing = match std::fs::read(dest) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let outcome = match existing {
        None => {
            io::atomic_write(dest, content.as_bytes())?;
            FileOutcome::created(dest.to_path_buf())
        }
        Some(bytes) if bytes == content.as_bytes() => {
            FileOutcome::skipped(dest.to_path_buf(), REASON_IDENTICAL)
        }
        Some(_) if !force => FileOutcome::conflict(dest.to_path_buf(), REASON_CONFLICT),
        Some(_) => {
            io::atomic_write(dest, content.as_bytes())?;
            FileOutcome::updated(dest.to_path_buf())
        }
    };

    tracing::debug!(action = %outcome.action, path = %dest.display(), "reconciled");
    Ok(outcome)
}
