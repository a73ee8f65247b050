//! TreePrune - Allowlist-Driven Tree Pruner
//!
//! TreePrune deletes every file under a set of target directories that an
//! allowlist does not protect, then removes the empty directories left
//! behind. The allowlist is a flat newline-delimited text file; entries are
//! either bare file names (basename matching) or paths relative to the base
//! directory (full-path matching).
//!
//! ## Pruning order
//!
//! Each target root is pruned in two strict phases:
//! 1. Every unprotected file in the subtree is deleted. Symlinks are leaf
//!    entries, never followed.
//! 2. Directories are swept bottom-up in a single post-order pass: a
//!    directory is removed only if it is empty after all its descendants
//!    have been resolved and the allowlist does not reserve it for a listed
//!    file (which may not yet exist on disk).
//!
//! The allowlist file and the pruner's own executable are always protected,
//! wherever they appear in a target tree.

pub mod allowlist;
pub mod config;
pub mod pruner;

// Re-export commonly used items
pub use allowlist::{rel_key, Allowlist, MatchMode};
pub use config::{discover_roots, resolve_base_dir, DiscoveryMode};
pub use pruner::{prune_root, PruneOptions, PruneStats};
