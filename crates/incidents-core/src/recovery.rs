//! Recovery for a durable copy that can no longer be read.
//!
//! Corrupt data is quarantined, never deleted outright: the bad file is
//! renamed to `<name>.corrupt-<UTC timestamp>` next to the original, so an
//! operator can inspect or hand-repair it after the store has started fresh.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const QUARANTINE_MARKER: &str = ".corrupt-";

/// Sibling path a quarantined copy of `path` is moved to.
fn quarantine_target(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(format!("{QUARANTINE_MARKER}{stamp}"));
    path.with_file_name(name)
}

/// Rename `path` aside for manual inspection.
///
/// Returns the new location, or `None` if `path` does not exist.
///
/// # Errors
///
/// Returns an I/O error if the rename fails.
pub fn quarantine_file(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let target = quarantine_target(path);
    fs::rename(path, &target)?;

    tracing::warn!(
        path = %path.display(),
        backup = %target.display(),
        "quarantined unreadable incident store"
    );
    Ok(Some(target))
}

/// Quarantined copies of `path` that still sit next to it, oldest first.
///
/// # Errors
///
/// Returns an I/O error if the parent directory cannot be listed.
pub fn quarantined_copies(path: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(dir) = path.parent() else {
        return Ok(Vec::new());
    };
    let Some(base) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{base}{QUARANTINE_MARKER}");
    let mut copies = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix))
        {
            copies.push(entry.path());
        }
    }
    // Timestamps sort lexicographically.
    copies.sort();
    Ok(copies)
}
