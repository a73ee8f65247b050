//! Allowlist loading, normalization, and protection checks.

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// How allowlist entries are compared against files found in a target tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchMode {
    /// The comparison key is the file name only; a matching file is protected
    /// anywhere in the tree, regardless of directory.
    Basename,
    /// The comparison key is the path relative to the base directory; only an
    /// exact path match is protected.
    FullPath,
}

/// The set of comparison keys that protect files from deletion, plus the
/// directories those keys reserve.
///
/// Built once per run and shared read-only across the whole walk.
#[derive(Debug)]
pub struct Allowlist {
    mode: MatchMode,
    keys: HashSet<String>,
    /// Directories referenced, directly or through an ancestor, by an
    /// allowlist entry's directory portion. A reserved directory is never
    /// deleted even when empty, so a later run can restore the listed file
    /// into it. This holds whether or not the file currently exists on disk.
    reserved_dirs: HashSet<String>,
}

impl Allowlist {
    /// Load an allowlist from a newline-delimited text file.
    pub fn load(path: &Path, mode: MatchMode) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read allowlist {}", path.display()))?;
        Ok(Self::parse(&data, mode))
    }

    /// Parse allowlist text: one entry per line, trimmed and normalized,
    /// blank lines discarded. Duplicate entries collapse into one key;
    /// malformed lines are never an error, they simply match nothing.
    pub fn parse(data: &str, mode: MatchMode) -> Self {
        let mut keys = HashSet::new();
        let mut reserved_dirs = HashSet::new();

        for line in data.lines() {
            let entry = match normalize_entry(line) {
                Some(entry) => entry,
                None => continue,
            };

            // Reserve the entry's parent directory and every ancestor of it.
            let mut dir = entry.rsplit_once('/').map(|(d, _)| d);
            while let Some(d) = dir {
                reserved_dirs.insert(d.to_string());
                dir = d.rsplit_once('/').map(|(p, _)| p);
            }

            let key = match mode {
                MatchMode::Basename => entry
                    .rsplit('/')
                    .next()
                    .unwrap_or(entry.as_str())
                    .to_string(),
                MatchMode::FullPath => entry,
            };
            keys.insert(key);
        }

        Allowlist {
            mode,
            keys,
            reserved_dirs,
        }
    }

    /// Whether a file with the given normalized relative path is protected.
    pub fn protects(&self, rel_path: &str) -> bool {
        let key = match self.mode {
            MatchMode::Basename => rel_path.rsplit('/').next().unwrap_or(rel_path),
            MatchMode::FullPath => rel_path,
        };
        self.keys.contains(key)
    }

    /// Whether the allowlist reserves a directory with the given normalized
    /// relative path for a listed file.
    pub fn reserves(&self, rel_dir: &str) -> bool {
        self.reserved_dirs.contains(rel_dir)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate the loaded comparison keys (for verbose listings).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Normalize one allowlist line into a comparison key: trim whitespace,
/// canonicalize separators to `/`, and drop empty and `.` components.
/// Returns `None` for lines that normalize to nothing.
fn normalize_entry(line: &str) -> Option<String> {
    let trimmed = line.trim().replace('\\', "/");
    let components: Vec<&str> = trimmed
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();
    if components.is_empty() {
        return None;
    }
    Some(components.join("/"))
}

/// Normalize a path relative to `base` into the comparison-key form used by
/// [`Allowlist::protects`] and [`Allowlist::reserves`].
pub fn rel_key(path: &Path, base: &Path) -> Result<String> {
    let rel = path.strip_prefix(base).with_context(|| {
        format!(
            "Path {} is not under base directory {}",
            path.display(),
            base.display()
        )
    })?;
    let components: Vec<String> = rel
        .components()
        .filter_map(|c| {
            if let std::path::Component::Normal(os_str) = c {
                Some(os_str.to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .collect();
    Ok(components.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalizes_entries() {
        assert_eq!(normalize_entry("  keep.txt "), Some("keep.txt".to_string()));
        assert_eq!(normalize_entry("a\\b\\c.txt"), Some("a/b/c.txt".to_string()));
        assert_eq!(normalize_entry("./a//b/"), Some("a/b".to_string()));
        assert_eq!(normalize_entry(""), None);
        assert_eq!(normalize_entry("   "), None);
        assert_eq!(normalize_entry("./."), None);
    }

    #[test]
    fn blank_lines_and_duplicates_collapse() {
        let list = Allowlist::parse("keep.txt\n\nkeep.txt\n  \nother.txt\n", MatchMode::Basename);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn basename_mode_matches_anywhere() {
        let list = Allowlist::parse("keep.txt\n", MatchMode::Basename);
        assert!(list.protects("keep.txt"));
        assert!(list.protects("deep/nested/keep.txt"));
        assert!(!list.protects("drop.txt"));
        assert!(!list.protects("deep/keep.txt.bak"));
    }

    #[test]
    fn basename_mode_uses_final_component_of_entries() {
        let list = Allowlist::parse("some/dir/keep.txt\n", MatchMode::Basename);
        assert!(list.protects("elsewhere/keep.txt"));
    }

    #[test]
    fn full_path_mode_requires_exact_match() {
        let list = Allowlist::parse("proj/data/keep.txt\n", MatchMode::FullPath);
        assert!(list.protects("proj/data/keep.txt"));
        assert!(!list.protects("keep.txt"));
        assert!(!list.protects("other/data/keep.txt"));
    }

    #[test]
    fn reservation_covers_ancestors() {
        let list = Allowlist::parse("proj/data/deep/keep.txt\n", MatchMode::FullPath);
        assert!(list.reserves("proj/data/deep"));
        assert!(list.reserves("proj/data"));
        assert!(list.reserves("proj"));
        assert!(!list.reserves("proj/other"));
        assert!(!list.reserves("proj/data/deep/keep.txt"));
    }

    #[test]
    fn bare_names_reserve_nothing() {
        let list = Allowlist::parse("keep.txt\n", MatchMode::Basename);
        assert!(!list.reserves("keep.txt"));
        assert!(!list.reserves(""));
    }

    #[test]
    fn rel_key_joins_with_forward_slashes() {
        let base = PathBuf::from("/base");
        let path = base.join("a").join("b").join("c.txt");
        assert_eq!(rel_key(&path, &base).unwrap(), "a/b/c.txt");
    }

    #[test]
    fn rel_key_rejects_paths_outside_base() {
        let base = PathBuf::from("/base");
        assert!(rel_key(Path::new("/elsewhere/file"), &base).is_err());
    }
}
