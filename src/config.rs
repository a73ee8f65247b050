//! Run configuration and target-root discovery.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::fs;
use std::path::{Path, PathBuf};

/// Where target roots are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryMode {
    /// Each immediate subdirectory of `DIR/target` is an independent root.
    TargetDir,
    /// Each immediate subdirectory of `DIR` itself is an independent root.
    SiblingDirs,
}

/// Resolve the base directory the roots live in (and that relative comparison
/// keys are computed against). In `target-dir` mode the `target/` directory
/// must already exist; its absence is a precondition failure, checked before
/// any mutation.
pub fn resolve_base_dir(exec_dir: &Path, mode: DiscoveryMode) -> Result<PathBuf> {
    match mode {
        DiscoveryMode::TargetDir => {
            let target = exec_dir.join("target");
            if !target.is_dir() {
                bail!("Target directory {} not found", target.display());
            }
            Ok(target)
        }
        DiscoveryMode::SiblingDirs => Ok(exec_dir.to_path_buf()),
    }
}

/// Discover target roots: the immediate subdirectories of the base directory,
/// sorted. Symlinks are never treated as roots. Zero roots is not an error.
pub fn discover_roots(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(base_dir)
        .with_context(|| format!("Failed to read base directory {}", base_dir.display()))?;

    let mut roots = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read an entry of {}", base_dir.display()))?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if metadata.is_dir() {
            roots.push(path);
        }
    }
    roots.sort();
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_dir_mode_requires_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_base_dir(dir.path(), DiscoveryMode::TargetDir).is_err());

        fs::create_dir(dir.path().join("target")).unwrap();
        let base = resolve_base_dir(dir.path(), DiscoveryMode::TargetDir).unwrap();
        assert_eq!(base, dir.path().join("target"));
    }

    #[test]
    fn sibling_dirs_mode_uses_exec_dir_itself() {
        let dir = tempfile::tempdir().unwrap();
        let base = resolve_base_dir(dir.path(), DiscoveryMode::SiblingDirs).unwrap();
        assert_eq!(base, dir.path());
    }

    #[test]
    fn discovers_only_immediate_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir_all(dir.path().join("a/nested")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let roots = discover_roots(dir.path()).unwrap();
        assert_eq!(roots, vec![dir.path().join("a"), dir.path().join("b")]);
    }

    #[test]
    fn empty_base_yields_zero_roots() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_roots(dir.path()).unwrap().is_empty());
    }
}
