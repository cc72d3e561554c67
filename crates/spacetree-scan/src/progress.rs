//! Scan progress reporting.
//!
//! Progress is derived from the tree on demand; the scanner keeps no
//! separate counters.

use spacetree_core::{ItemTree, NodeId, NodeKind};

use crate::synthetic;

/// Progress snapshot of a scan root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Files found so far.
    pub files_scanned: u64,
    /// Directories found so far.
    pub dirs_scanned: u64,
    /// Real bytes accounted for so far.
    pub bytes_scanned: u64,
    /// Directory listings still outstanding.
    pub pending_read_jobs: u64,
    /// Current progress position.
    pub position: u64,
    /// Expected final position, 0 when unknown.
    pub range: u64,
    /// Whether the root is Done.
    pub done: bool,
}

impl ScanProgress {
    /// Snapshot the progress of the subtree rooted at `id`.
    ///
    /// Volumes and computers measure bytes against the used space the
    /// volumes report; other roots measure items found and have no range.
    pub fn of(tree: &ItemTree, id: NodeId) -> Self {
        let node = &tree[id];
        let mut progress = Self {
            files_scanned: node.file_count,
            dirs_scanned: node.subdir_count,
            bytes_scanned: node.size,
            pending_read_jobs: node.pending_read_jobs,
            done: node.done,
            ..Self::default()
        };

        let volumes: Vec<NodeId> = match node.kind {
            NodeKind::Volume => vec![id],
            NodeKind::Computer => tree
                .children(id)
                .iter()
                .copied()
                .filter(|c| tree[*c].kind == NodeKind::Volume)
                .collect(),
            _ => Vec::new(),
        };

        if volumes.is_empty() {
            progress.position = progress.total_items();
            return progress;
        }

        progress.bytes_scanned = volumes.iter().map(|v| synthetic::real_size(tree, *v)).sum();
        progress.range = volumes
            .iter()
            .filter_map(|v| tree[*v].space)
            .map(|s| s.used())
            .sum();
        progress.position = progress.bytes_scanned;
        progress
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_scanned
    }

    /// Completed share in `0.0..=1.0`, `None` while the range is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.done {
            return Some(1.0);
        }
        if self.range == 0 {
            return None;
        }
        Some((self.position as f64 / self.range as f64).min(1.0))
    }
}
