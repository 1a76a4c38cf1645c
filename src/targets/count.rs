//! Recursive item-count estimate used to scale scan progress.

use std::fs;
use std::io;
use std::path::Path;

/// What: Count non-directory entries below `root`.
///
/// Inputs:
/// - `root`: Directory (or single file) about to be scanned.
///
/// Output:
/// - `Ok(n)` with the number of files, symlinks and special files found;
///   `Err` when `root` itself cannot be inspected or listed.
///
/// Details:
/// - `root` itself is resolved through symlinks, as the engine does for the
///   path it is given.
/// - Entry types below the root come from `DirEntry::file_type`, which does
///   not follow symlinks: a symlinked directory counts as one item and cannot loop.
/// - Unreadable subdirectories contribute zero and are logged at debug level.
/// - A regular file given as the root counts as one item.
/// - Runs synchronously; call it from `spawn_blocking` on large trees.
///
/// # Errors
/// - Returns the I/O error when `root` cannot be inspected or listed.
pub fn count_items(root: &Path) -> io::Result<u64> {
    let meta = fs::metadata(root)?;
    if !meta.is_dir() {
        return Ok(1);
    }
    let mut total: u64 = 0;
    let mut stack = vec![root.to_path_buf()];
    let mut first = true;
    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if first => return Err(e),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "[Count] skipping unreadable directory");
                continue;
            }
        };
        first = false;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "[Count] skipping unreadable entry");
                    continue;
                }
            };
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => stack.push(entry.path()),
                Ok(_) => total = total.saturating_add(1),
                Err(e) => {
                    tracing::debug!(path = %entry.path().display(), error = %e, "[Count] unknown entry type");
                    total = total.saturating_add(1);
                }
            }
        }
    }
    tracing::debug!(root = %root.display(), total, "[Count] items counted");
    Ok(total)
}
