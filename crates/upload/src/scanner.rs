//! Collects transfer units from command-line paths.
//!
//! Files are taken as-is; directories are walked recursively in name order.
//! Symlinked directories found during a walk are skipped.
//! Paths that cannot be read are reported separately so the rest of the
//! submission can still go ahead.

use std::path::{Path, PathBuf};

use fileshare_transfer::{TransferError, TransferUnit};
use tracing::debug;

/// Units found under the given paths, plus the paths that could not be read.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Units indexed in discovery order.
    pub units: Vec<TransferUnit>,
    pub unreadable: Vec<(PathBuf, TransferError)>,
}

impl ScanResult {
    pub fn total_size(&self) -> u64 {
        self.units.iter().map(|u| u.size).sum()
    }
}

/// Expands `paths` into transfer units.
pub fn collect_units(paths: &[PathBuf]) -> ScanResult {
    let mut scan = ScanResult::default();
    for path in paths {
        if path.is_dir() {
            walk_dir(path, &mut scan);
        } else {
            push_file(path, &mut scan);
        }
    }
    scan
}

fn walk_dir(dir: &Path, scan: &mut ScanResult) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            scan.unreadable.push((dir.to_path_buf(), e.into()));
            return;
        }
    };

    let mut found: Vec<(PathBuf, std::fs::FileType)> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                scan.unreadable.push((dir.to_path_buf(), e.into()));
                continue;
            }
        };
        // `DirEntry::file_type` does not follow symlinks.
        match entry.file_type() {
            Ok(file_type) => found.push((entry.path(), file_type)),
            Err(e) => scan.unreadable.push((entry.path(), e.into())),
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));

    for (path, file_type) in found {
        if file_type.is_dir() {
            walk_dir(&path, scan);
        } else if file_type.is_symlink() && path.is_dir() {
            debug!(path = %path.display(), "skipping symlinked directory");
        } else {
            push_file(&path, scan);
        }
    }
}

fn push_file(path: &Path, scan: &mut ScanResult) {
    match TransferUnit::from_path(scan.units.len(), path) {
        Ok(unit) => scan.units.push(unit),
        Err(e) => scan.unreadable.push((path.to_path_buf(), e)),
    }
}
