//! Two-phase tree pruning: file deletion, then empty-directory sweep.

use crate::allowlist::{rel_key, Allowlist};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Options controlling prune behavior (runtime flags)
#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub verbose: bool,
    /// File names that survive every run regardless of allowlist contents:
    /// the allowlist's own file name and the running executable's name.
    pub protected_names: Vec<String>,
}

/// Counters for one pruning run
#[derive(Debug, Default, Clone, Copy)]
pub struct PruneStats {
    pub files_deleted: u64,
    pub dirs_deleted: u64,
    pub bytes_freed: u64,
}

impl PruneStats {
    pub fn merge(&mut self, other: PruneStats) {
        self.files_deleted += other.files_deleted;
        self.dirs_deleted += other.dirs_deleted;
        self.bytes_freed += other.bytes_freed;
    }
}

/// Prune a single target root: delete every unprotected file in the subtree,
/// then remove empty directories the allowlist does not reserve. Relative
/// keys are computed against `base_dir`, the parent of the target roots.
/// The root itself is never deleted.
///
/// Failure policy: any read or delete error aborts the run. Deletions already
/// performed are not rolled back.
pub fn prune_root(
    root: &Path,
    base_dir: &Path,
    allowlist: &Allowlist,
    options: &PruneOptions,
) -> Result<PruneStats> {
    let mut stats = PruneStats::default();
    delete_files(root, base_dir, allowlist, options, &mut stats)?;
    sweep_empty_dirs(root, base_dir, allowlist, options, &mut stats)?;
    Ok(stats)
}

/// Phase 1: delete every file in the subtree whose comparison key is not in
/// the allowlist. Symlinks are leaf entries here: subject to deletion like
/// any file, and never descended into.
fn delete_files(
    root: &Path,
    base_dir: &Path,
    allowlist: &Allowlist,
    options: &PruneOptions,
    stats: &mut PruneStats,
) -> Result<()> {
    // Snapshot the walk before deleting anything, so no directory listing is
    // mutated while it is being iterated. Sorted for deterministic output,
    // like the directory sweep.
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to walk target root {}", root.display()))?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }

    for path in files {
        let rel = rel_key(&path, base_dir)?;
        if is_protected(&path, &rel, allowlist, options) {
            if options.verbose {
                println!("Keeping: {}", path.display());
            }
            continue;
        }

        // Size probe failures count 0 rather than aborting; the deletion
        // itself is still mandatory.
        let size = fs::symlink_metadata(&path).map(|m| m.len()).unwrap_or(0);
        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete file {}", path.display()))?;
        println!("Removed file: {}", path.display());
        stats.files_deleted += 1;
        stats.bytes_freed += size;
    }

    Ok(())
}

/// A file is protected when its name is one of the self-protected names or
/// its comparison key is in the allowlist.
fn is_protected(path: &Path, rel: &str, allowlist: &Allowlist, options: &PruneOptions) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if options.protected_names.iter().any(|p| p == name) {
            return true;
        }
    }
    allowlist.protects(rel)
}

/// Phase 2: single bottom-up pass over the subtree's directories. A directory
/// is removed only once all its descendants have been resolved, it holds zero
/// remaining entries, and the allowlist does not reserve it.
fn sweep_empty_dirs(
    dir: &Path,
    base_dir: &Path,
    allowlist: &Allowlist,
    options: &PruneOptions,
    stats: &mut PruneStats,
) -> Result<()> {
    for child in read_subdirs(dir)? {
        sweep_empty_dirs(&child, base_dir, allowlist, options, stats)?;

        if !dir_is_empty(&child)? {
            continue;
        }
        let rel = rel_key(&child, base_dir)?;
        if allowlist.reserves(&rel) {
            if options.verbose {
                println!("Keeping reserved directory: {}", child.display());
            }
            continue;
        }

        fs::remove_dir(&child)
            .with_context(|| format!("Failed to delete directory {}", child.display()))?;
        println!("Removed directory: {}", child.display());
        stats.dirs_deleted += 1;
    }
    Ok(())
}

/// Snapshot the immediate subdirectories of `dir`, sorted for deterministic
/// output. Symlinks to directories are leaves, not directories to sweep.
fn read_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read an entry of {}", dir.display()))?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if metadata.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_is_empty(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;
    Ok(entries.next().is_none())
}
