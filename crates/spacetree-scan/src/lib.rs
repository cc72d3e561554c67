//! Cooperative scanning engine for spacetree.
//!
//! # Overview
//!
//! `spacetree-scan` fills an [`ItemTree`] incrementally. The host calls
//! [`Scanner::work`] in short slices from its idle loop; each slice lists a
//! few directories, charges what it found to every ancestor, and returns
//! when its [`WorkBudget`] runs out. Key features:
//!
//! - **Interruptible** at any budget check with the tree fully consistent
//! - **Fair** time distribution across sibling subtrees
//! - **Refresh** of any subtree, including detection of deleted items
//! - **Free/unknown space** items for volume roots
//!
//! The `test-util` feature adds `MemoryProbe`, an in-memory filesystem for
//! deterministic scans.
//!
//! # Example
//!
//! ```rust,no_run
//! use spacetree_scan::{ItemTree, MonotonicClock, ScanPolicy, ScanProgress, Scanner, StdProbe};
//!
//! let mut tree = ItemTree::new_directory_root("/path/to/scan");
//! let mut scanner = Scanner::new(StdProbe::new(), ScanPolicy::default());
//! let clock = MonotonicClock::new();
//!
//! while !scanner.work_for(&mut tree, &clock, 50) {
//!     let progress = ScanProgress::of(&tree, tree.root());
//!     println!("{} items so far", progress.total_items());
//! }
//! println!("Total size: {} bytes", tree[tree.root()].size);
//! ```

mod budget;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod observer;
mod probe;
mod progress;
mod refresh;
mod scanner;
mod std_probe;
pub mod synthetic;

pub use budget::{
    Clock, DEFAULT_YIELD_POLL_INTERVAL, ManualClock, MonotonicClock, WorkBudget,
};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryProbe;
pub use observer::{NoopObserver, ScanObserver};
pub use probe::{EntryInfo, FileSystemProbe};
pub use progress::ScanProgress;
pub use refresh::RefreshOutcome;
pub use scanner::Scanner;
pub use std_probe::StdProbe;

// Re-export core types for convenience
pub use spacetree_core::{
    Attributes, ItemTree, LayoutItem, Node, NodeId, NodeKind, NodeRef, Presentable, ProbeError,
    ScanPolicy, ScanWarning, VolumeSpace, WarningKind,
};
