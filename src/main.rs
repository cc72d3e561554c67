//! spacetree - incremental, interruptible disk usage scanner.
//!
//! Usage:
//!   spacetree [PATH]...                 Scan directories and print a summary
//!   spacetree --volume /mnt/data        Scan a volume, with free/unknown space
//!   spacetree /mnt/a /mnt/b --volume    Scan several volumes under one root
//!   spacetree --format json [PATH]      Print the tree as JSON
//!   spacetree --help                    Show help

use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use serde::Serialize;
use tracing::{debug, info};

use spacetree_core::{ItemTree, NodeKind, NodeRef, Presentable, ScanPolicy};
use spacetree_scan::{MonotonicClock, ScanProgress, Scanner, StdProbe};

#[derive(Parser)]
#[command(
    name = "spacetree",
    version,
    about = "Incremental, interruptible disk usage scanner",
    long_about = "spacetree scans a directory, a volume or several volumes in short \
                  time slices, keeping every total consistent between slices.\n\n\
                  Set RUST_LOG=spacetree_scan=debug to trace the scan."
)]
struct Cli {
    /// Paths to scan (defaults to current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Treat the paths as volume roots and show free and unknown space
    #[arg(long)]
    volume: bool,

    /// Label shown for a single volume root
    #[arg(long, requires = "volume")]
    label: Option<String>,

    /// Descend into directories other volumes are mounted on
    #[arg(long)]
    follow_mount_points: bool,

    /// Descend into junctions and directory symlinks
    #[arg(long)]
    follow_junctions: bool,

    /// Do not show the free space item of volumes
    #[arg(long)]
    no_free_space: bool,

    /// Do not show the unknown space item of volumes
    #[arg(long)]
    no_unknown: bool,

    /// Collect the files of mixed directories under a <Files> item
    #[arg(long)]
    group_files: bool,

    /// Report file lengths instead of allocated size
    #[arg(long)]
    apparent_size: bool,

    /// Length of one scan slice in milliseconds
    #[arg(long, default_value = "50")]
    slice_ms: u64,

    /// Maximum depth to display
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Number of top entries to show per directory
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,

    /// Suppress the progress line
    #[arg(short, long)]
    quiet: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A node as written by `--format json`.
#[derive(Serialize)]
struct ExportNode {
    name: String,
    kind: NodeKind,
    size: u64,
    files: u64,
    subdirs: u64,
    last_change: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ExportNode>,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let policy = ScanPolicy::builder()
        .follow_mount_points(cli.follow_mount_points)
        .follow_junctions(cli.follow_junctions)
        .show_free_space(!cli.no_free_space)
        .show_unknown(!cli.no_unknown)
        .group_files(cli.group_files)
        .build()
        .context("Invalid scan policy")?;

    let mut tree = build_tree(cli)?;
    let probe = StdProbe::new().with_apparent_size(cli.apparent_size);
    let mut scanner = Scanner::new(probe, policy);

    eprintln!("Scanning {}...", tree[tree.root()].name);
    let started = std::time::Instant::now();
    let clock = MonotonicClock::new();
    let mut slices = 0u64;
    while !scanner.work_for(&mut tree, &clock, cli.slice_ms) {
        slices += 1;
        if !cli.quiet {
            print_progress(&ScanProgress::of(&tree, tree.root()));
        }
    }
    if !cli.quiet {
        eprintln!();
    }
    info!(slices, elapsed = ?started.elapsed(), "scan finished");

    let root = NodeRef::new(&tree, tree.root());
    match cli.format {
        OutputFormat::Text => print_summary(root, started.elapsed(), cli.depth, cli.top),
        OutputFormat::Json => {
            let export = export_node(root, 0, cli.depth);
            println!("{}", serde_json::to_string_pretty(&export)?);
        }
    }

    let warnings = scanner.take_warnings();
    if !warnings.is_empty() {
        for warning in &warnings {
            debug!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        }
        eprintln!("{} warning(s) during scan", warnings.len());
    }

    Ok(())
}

/// Pick the root shape from the command line: a directory, one volume, or a
/// computer holding several volumes.
fn build_tree(cli: &Cli) -> Result<ItemTree> {
    let paths = cli
        .paths
        .iter()
        .map(|p| {
            p.canonicalize()
                .with_context(|| format!("Invalid path: {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    match (cli.volume, paths.as_slice()) {
        (_, []) => bail!("No path given"),
        (false, [path]) => Ok(ItemTree::new_directory_root(path)),
        (false, _) => bail!("Scanning several paths requires --volume"),
        (true, [path]) => Ok(ItemTree::new_volume_root(
            path,
            cli.label.as_deref().unwrap_or_default(),
        )),
        (true, paths) => {
            let mut tree = ItemTree::new_computer("Computer");
            let root = tree.root();
            for path in paths {
                tree.add_volume(root, path, "");
            }
            Ok(tree)
        }
    }
}

/// Overwrite the progress line on stderr.
fn print_progress(progress: &ScanProgress) {
    let share = progress
        .fraction()
        .map(|f| format!("{:>5.1}%", f * 100.0))
        .unwrap_or_else(|| "   --".to_string());
    eprint!(
        "\r {} {} files, {} directories, {} ({} pending)   ",
        share,
        progress.files_scanned,
        progress.dirs_scanned,
        format_size(progress.bytes_scanned),
        progress.pending_read_jobs
    );
    let _ = std::io::stderr().flush();
}

fn print_summary(root: NodeRef<'_>, elapsed: std::time::Duration, depth: u32, top_n: usize) {
    let node = root.node();

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", root.display_name(), format_size(root.size()));
    println!(
        " {} files, {} directories",
        node.file_count, node.subdir_count
    );
    println!(" Last change {}", format_time(root.last_change()));
    println!(" Scanned in {:.2}s", elapsed.as_secs_f64());
    println!("{}", "─".repeat(60));
    println!();

    print_node(root, 0, depth, top_n, root.size());
}

/// Print a node and its largest children.
fn print_node(node: NodeRef<'_>, depth: u32, max_depth: u32, top_n: usize, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        node.size() as f64 / root_size as f64
    } else {
        0.0
    };
    let expandable = node.node().child_count() > 0;
    let marker = match node.kind() {
        NodeKind::Directory | NodeKind::Volume | NodeKind::Computer => "/",
        _ => "",
    };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}",
        indent,
        if expandable { "▼ " } else { "  " },
        truncate(&format!("{}{}", node.display_name(), marker), 40),
        format_size(node.size()),
        ratio * 100.0,
        make_bar(ratio, 10)
    );

    if !expandable || depth >= max_depth {
        return;
    }

    let mut children: Vec<NodeRef<'_>> = node.children().collect();
    children.sort_by(|a, b| b.size().cmp(&a.size()));
    let remaining = children.len().saturating_sub(top_n);

    for child in children.into_iter().take(top_n) {
        print_node(child, depth + 1, max_depth, top_n, root_size);
    }

    if remaining > 0 {
        let indent = "  ".repeat((depth + 1) as usize);
        println!("{}  ... and {} more", indent, remaining);
    }
}

/// Convert the displayed part of the tree for JSON output.
fn export_node(node: NodeRef<'_>, depth: u32, max_depth: u32) -> ExportNode {
    let children = if depth < max_depth {
        node.children()
            .map(|c| export_node(c, depth + 1, max_depth))
            .collect()
    } else {
        Vec::new()
    };
    ExportNode {
        name: node.display_name().to_string(),
        kind: node.kind(),
        size: node.size(),
        files: node.node().file_count,
        subdirs: node.node().subdir_count,
        last_change: DateTime::<Utc>::from(node.last_change()),
        children,
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Local time, or "-" for items that never reported one.
fn format_time(time: SystemTime) -> String {
    if time == SystemTime::UNIX_EPOCH {
        return "-".to_string();
    }
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{}…", kept)
    }
}
