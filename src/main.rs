use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use humansize::{format_size, BINARY};
use std::path::{Path, PathBuf};
use treeprune::allowlist::{Allowlist, MatchMode};
use treeprune::config::{discover_roots, resolve_base_dir, DiscoveryMode};
use treeprune::pruner::{prune_root, PruneOptions, PruneStats};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Delete every file under the target trees that an allowlist does not protect, then remove the empty directories left behind",
    long_about = None
)]
struct Args {
    /// Directory the run is anchored to (allowlist and targets are resolved
    /// against it)
    #[arg(default_value = ".")]
    dir: String,

    /// Allowlist file name, one entry per line, located in DIR
    #[arg(long, short, default_value = "file_list.txt")]
    list: String,

    /// How allowlist entries are matched against files
    #[arg(long, value_enum, default_value_t = MatchMode::Basename)]
    match_mode: MatchMode,

    /// Where target roots are discovered
    #[arg(long, value_enum, default_value_t = DiscoveryMode::TargetDir)]
    discovery: DiscoveryMode,

    /// Show per-entry decisions instead of only deletions
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let exec_dir = PathBuf::from(&args.dir)
        .canonicalize()
        .with_context(|| format!("Failed to resolve directory {}", args.dir))?;

    // Preconditions are validated up front, before any mutation.
    let allowlist_path = exec_dir.join(&args.list);
    if !allowlist_path.is_file() {
        bail!("Allowlist {} not found", allowlist_path.display());
    }
    let base_dir = resolve_base_dir(&exec_dir, args.discovery)?;

    println!("Loading allowlist...");
    let allowlist = Allowlist::load(&allowlist_path, args.match_mode)?;
    println!("{} entries loaded", allowlist.len());
    if allowlist.is_empty() {
        eprintln!("Warning: allowlist is empty; only self-protected files will survive");
    }
    if args.verbose {
        for key in allowlist.keys() {
            println!("  {key}");
        }
    }

    let roots = discover_roots(&base_dir)?;
    if roots.is_empty() {
        println!(
            "No target directories found under {}; nothing to do.",
            base_dir.display()
        );
        return Ok(());
    }

    let options = PruneOptions {
        verbose: args.verbose,
        protected_names: protected_names(&allowlist_path),
    };

    let mut total = PruneStats::default();
    for root in &roots {
        println!("{}", format!("Pruning {}", root.display()).bold());
        let stats = prune_root(root, &base_dir, &allowlist, &options)?;
        println!(
            "Finished {}: {} files, {} directories removed",
            root.display(),
            stats.files_deleted,
            stats.dirs_deleted
        );
        total.merge(stats);
    }

    println!("========================================");
    println!("Files removed: {}", total.files_deleted.to_string().bold());
    println!(
        "Directories removed: {}",
        total.dirs_deleted.to_string().bold()
    );
    println!(
        "Space freed: {}",
        format_size(total.bytes_freed, BINARY).green()
    );

    Ok(())
}

/// Names that survive every run wherever they appear in a target tree: the
/// allowlist file itself and the running executable.
fn protected_names(allowlist_path: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(name) = allowlist_path.file_name().and_then(|n| n.to_str()) {
        names.push(name.to_string());
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(name) = exe.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names
}
