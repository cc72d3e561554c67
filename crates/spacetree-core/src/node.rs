//! Item node types.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Slot index of a node within an [`ItemTree`](crate::ItemTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a slot index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Slot index in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// File attribute bits reported by the probe.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Attributes: u8 {
        const READ_ONLY     = 0b0000_0001;
        const HIDDEN        = 0b0000_0010;
        const SYSTEM        = 0b0000_0100;
        const ARCHIVE       = 0b0000_1000;
        const REPARSE_POINT = 0b0001_0000;
        const COMPRESSED    = 0b0010_0000;
        const ENCRYPTED     = 0b0100_0000;
    }
}

/// Total and free bytes of a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpace {
    /// Capacity in bytes.
    pub total: u64,
    /// Free bytes.
    pub free: u64,
}

impl VolumeSpace {
    /// Capacity and free bytes as reported by the volume.
    pub fn new(total: u64, free: u64) -> Self {
        Self { total, free }
    }

    /// Bytes in use according to the volume itself.
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.free)
    }

    /// Whether the query produced nothing usable.
    pub fn is_unknown(&self) -> bool {
        self.total == 0
    }
}

/// Type of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Synthetic root holding several volumes.
    Computer,
    /// Root of a mounted volume.
    Volume,
    /// Directory.
    Directory,
    /// Regular file.
    File,
    /// Synthetic container for the files of a directory.
    FilesGroup,
    /// Synthetic leaf for a volume's free bytes.
    FreeSpace,
    /// Synthetic leaf for bytes the scan could not account for.
    Unknown,
}

impl NodeKind {
    /// Leaves never enumerate and are Done at creation.
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeKind::File | NodeKind::FreeSpace | NodeKind::Unknown)
    }

    /// Kinds that own a directory listing of their own.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Computer | NodeKind::Volume | NodeKind::Directory
        )
    }

    /// FreeSpace and Unknown.
    pub fn is_synthetic(self) -> bool {
        matches!(self, NodeKind::FreeSpace | NodeKind::Unknown)
    }
}

/// A single item in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node type.
    pub kind: NodeKind,

    /// Display name.
    pub name: CompactString,

    /// Absolute path, set only on roots and volumes. Everything else derives
    /// its path from its ancestors.
    pub path: Option<PathBuf>,

    /// Own size for leaves, sum of children otherwise.
    pub size: u64,

    /// Files in the subtree (1 for a File leaf).
    pub file_count: u64,

    /// Followed directories in the subtree, excluding this node.
    pub subdir_count: u64,

    /// Timestamp reported by the filesystem for this item alone.
    pub own_time: SystemTime,

    /// Max of `own_time` and every descendant's `last_change`.
    pub last_change: SystemTime,

    /// Attribute bits, `None` when unavailable.
    pub attributes: Option<Attributes>,

    /// Listings still outstanding in this subtree, this node included.
    pub pending_read_jobs: u64,

    /// Scheduler ticks charged to this subtree.
    pub ticks_worked: u64,

    /// Own listing has happened.
    pub read_done: bool,

    /// Own listing has happened and every child is Done.
    pub done: bool,

    /// Redirection (junction or mount point) the policy declined to follow.
    pub excluded: bool,

    /// Volume capacity, Volume nodes only.
    pub space: Option<VolumeSpace>,

    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    fn blank(kind: NodeKind, name: impl Into<CompactString>, own_time: SystemTime) -> Self {
        Self {
            kind,
            name: name.into(),
            path: None,
            size: 0,
            file_count: 0,
            subdir_count: 0,
            own_time,
            last_change: own_time,
            attributes: None,
            pending_read_jobs: 0,
            ticks_worked: 0,
            read_done: false,
            done: false,
            excluded: false,
            space: None,
            children: Vec::new(),
            parent: None,
        }
    }

    /// A File leaf, Done at creation.
    pub fn file(
        name: impl Into<CompactString>,
        size: u64,
        own_time: SystemTime,
        attributes: Option<Attributes>,
    ) -> Self {
        let mut node = Self::blank(NodeKind::File, name, own_time);
        node.size = size;
        node.file_count = 1;
        node.attributes = attributes;
        node.read_done = true;
        node.done = true;
        node
    }

    /// A Directory awaiting its own listing.
    pub fn directory(
        name: impl Into<CompactString>,
        own_time: SystemTime,
        attributes: Option<Attributes>,
    ) -> Self {
        let mut node = Self::blank(NodeKind::Directory, name, own_time);
        node.attributes = attributes;
        node.pending_read_jobs = 1;
        node
    }

    /// A directory the policy does not traverse: Done, empty, zero-sized.
    pub fn excluded_directory(
        name: impl Into<CompactString>,
        own_time: SystemTime,
        attributes: Option<Attributes>,
    ) -> Self {
        let mut node = Self::blank(NodeKind::Directory, name, own_time);
        node.attributes = attributes;
        node.excluded = true;
        node.read_done = true;
        node.done = true;
        node
    }

    /// A Volume awaiting its own listing.
    pub fn volume(label: &str, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut node = Self::blank(NodeKind::Volume, volume_display_name(label, &root), UNIX_EPOCH);
        node.path = Some(root);
        node.pending_read_jobs = 1;
        node
    }

    /// A Computer root. Its children are seeded by the caller, so it never
    /// lists anything itself.
    pub fn computer(name: impl Into<CompactString>) -> Self {
        let mut node = Self::blank(NodeKind::Computer, name, UNIX_EPOCH);
        node.read_done = true;
        node
    }

    /// Container for the file leaves of a directory.
    pub fn files_group() -> Self {
        let mut node = Self::blank(NodeKind::FilesGroup, FILES_GROUP_NAME, UNIX_EPOCH);
        node.read_done = true;
        node.done = true;
        node
    }

    /// A FreeSpace or Unknown leaf.
    pub fn synthetic(kind: NodeKind, size: u64) -> Self {
        debug_assert!(kind.is_synthetic());
        let name = match kind {
            NodeKind::FreeSpace => FREE_SPACE_NAME,
            _ => UNKNOWN_NAME,
        };
        let mut node = Self::blank(kind, name, UNIX_EPOCH);
        node.size = size;
        node.read_done = true;
        node.done = true;
        node
    }

    /// Whether this kind of node never has children.
    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    /// Direct children in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether the directory counts towards its parent's `subdir_count`.
    pub fn counts_as_subdir(&self) -> bool {
        self.kind == NodeKind::Directory && !self.excluded
    }
}

pub const FILES_GROUP_NAME: &str = "<Files>";
pub const FREE_SPACE_NAME: &str = "<Free Space>";
pub const UNKNOWN_NAME: &str = "<Unknown>";

/// `"label (root)"`, or the bare root when there is no label.
pub fn volume_display_name(label: &str, root: &std::path::Path) -> CompactString {
    let root = root.display();
    if label.is_empty() {
        compact_str::format_compact!("{root}")
    } else {
        compact_str::format_compact!("{label} ({root})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.0, 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn test_file_is_done_at_creation() {
        let node = Node::file("a.txt", 10, UNIX_EPOCH, None);
        assert!(node.done);
        assert!(node.is_leaf());
        assert_eq!(node.file_count, 1);
        assert_eq!(node.pending_read_jobs, 0);
    }

    #[test]
    fn test_directory_has_one_read_job() {
        let node = Node::directory("dir", UNIX_EPOCH, None);
        assert!(!node.done);
        assert!(!node.read_done);
        assert_eq!(node.pending_read_jobs, 1);
        assert!(node.counts_as_subdir());
    }

    #[test]
    fn test_excluded_directory_is_inert() {
        let node = Node::excluded_directory("junction", UNIX_EPOCH, Some(Attributes::REPARSE_POINT));
        assert!(node.done);
        assert_eq!(node.pending_read_jobs, 0);
        assert!(!node.counts_as_subdir());
    }

    #[test]
    fn test_volume_display_name() {
        assert_eq!(volume_display_name("System", Path::new("C:\\")), "System (C:\\)");
        assert_eq!(volume_display_name("", Path::new("/")), "/");
    }

    #[test]
    fn test_volume_space_used() {
        let space = VolumeSpace::new(100, 40);
        assert_eq!(space.used(), 60);
        assert!(!space.is_unknown());
        assert!(VolumeSpace::default().is_unknown());
    }

    #[test]
    fn test_kind_classification() {
        assert!(NodeKind::Unknown.is_leaf());
        assert!(NodeKind::FreeSpace.is_synthetic());
        assert!(!NodeKind::FilesGroup.is_leaf());
        assert!(!NodeKind::FilesGroup.is_container());
        assert!(NodeKind::Volume.is_container());
    }
}
