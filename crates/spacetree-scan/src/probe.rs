//! Filesystem probe interface.

use std::path::Path;
use std::time::SystemTime;

use compact_str::CompactString;
use spacetree_core::{Attributes, ProbeError, VolumeSpace};

/// One entry of a directory listing, or the metadata of a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// File name, no path components.
    pub name: CompactString,
    /// Directory (or a redirection to one).
    pub is_directory: bool,
    /// Attribute bits, `None` when unavailable.
    pub attributes: Option<Attributes>,
    /// Bytes occupied on disk.
    pub size: u64,
    /// Last write time.
    pub last_write: SystemTime,
}

/// Everything the scanner needs from a filesystem.
///
/// Listings are atomic from the scanner's point of view: a call either
/// yields the whole (possibly filtered) listing or fails as a whole.
/// Implementations skip individual unreadable entries instead of failing.
pub trait FileSystemProbe {
    /// List the entries of a directory.
    fn list_children(&self, path: &Path) -> Result<Vec<EntryInfo>, ProbeError>;

    /// Metadata of a single path. `ProbeError::NotFound` means it is gone.
    fn stat(&self, path: &Path) -> Result<EntryInfo, ProbeError>;

    /// Capacity of the volume rooted at `root`; `None` when unavailable.
    fn volume_space(&self, root: &Path) -> Option<VolumeSpace>;

    /// Whether `path` is where another volume is mounted.
    fn is_volume_mount_point(&self, path: &Path) -> bool;

    /// Whether `path` is a junction or directory symlink.
    fn is_junction(&self, path: &Path) -> bool;

    /// Whether the attribute bits mark a reparse point.
    fn is_reparse_point(&self, attributes: Option<Attributes>) -> bool {
        attributes.is_some_and(|a| a.contains(Attributes::REPARSE_POINT))
    }
}

impl<P: FileSystemProbe + ?Sized> FileSystemProbe for &P {
    fn list_children(&self, path: &Path) -> Result<Vec<EntryInfo>, ProbeError> {
        (**self).list_children(path)
    }

    fn stat(&self, path: &Path) -> Result<EntryInfo, ProbeError> {
        (**self).stat(path)
    }

    fn volume_space(&self, root: &Path) -> Option<VolumeSpace> {
        (**self).volume_space(root)
    }

    fn is_volume_mount_point(&self, path: &Path) -> bool {
        (**self).is_volume_mount_point(path)
    }

    fn is_junction(&self, path: &Path) -> bool {
        (**self).is_junction(path)
    }

    fn is_reparse_point(&self, attributes: Option<Attributes>) -> bool {
        (**self).is_reparse_point(attributes)
    }
}
