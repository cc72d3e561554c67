//! Hooks for consumers of scan events.

use std::path::Path;

use spacetree_core::{ItemTree, NodeId, ProbeError};

/// Receives scan events as they happen. All methods default to no-ops.
///
/// `file_found` is the attachment point for consumers of completed leaves,
/// such as duplicate detection.
pub trait ScanObserver {
    /// A File leaf was created; its size and timestamps are final.
    fn file_found(&mut self, _tree: &ItemTree, _id: NodeId) {}

    /// A non-leaf node became Done.
    fn node_done(&mut self, _tree: &ItemTree, _id: NodeId) {}

    /// A directory could not be listed and was kept empty.
    fn listing_failed(&mut self, _path: &Path, _error: &ProbeError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}
