//! Filesystem command handlers
//!
//! Listing, trash-based removal and moves. All of these are
//! per-command recoverable: the dispatcher turns any error here into
//! a `success:false` (or empty-listing) response and keeps running.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use fv_protocol::{DirEntry, EntryKind};

/// List the entries of a directory, folders before files, each group
/// sorted lexicographically by name.
pub fn list_dir(path: &Path) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(path).with_context(|| format!("read_dir {:?}", path))? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        // Follows symlinks, like the operator's file browser expects
        let metadata = match std::fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                continue;
            }
        };

        let created_at = creation_time(&metadata);
        if metadata.is_dir() {
            entries.push(DirEntry {
                kind: EntryKind::Folder,
                name,
                bytes: None,
                created_at,
            });
        } else {
            entries.push(DirEntry {
                kind: EntryKind::File,
                name,
                bytes: Some(metadata.len()),
                created_at,
            });
        }
    }

    entries.sort_by(|a, b| {
        let rank = |e: &DirEntry| e.kind == EntryKind::File;
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}

/// Creation time as RFC 3339, falling back to the modification time
/// on filesystems without birth-time support.
fn creation_time(metadata: &std::fs::Metadata) -> Option<String> {
    let time: SystemTime = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(DateTime::<Utc>::from(time).to_rfc3339())
}

/// Move the target to the OS trash/recycle location (recoverable, not
/// a permanent delete).
pub fn remove_to_trash(path: &Path) -> Result<()> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("canonicalize {:?}", path))?;
    trash::delete(&absolute).with_context(|| format!("trash {:?}", absolute))?;
    Ok(())
}
