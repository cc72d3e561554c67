//! Probe over the real filesystem.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
#[cfg(windows)]
use std::os::windows::fs::MetadataExt;

use compact_str::CompactString;
use spacetree_core::{Attributes, ProbeError, VolumeSpace};
use tracing::trace;

use crate::probe::{EntryInfo, FileSystemProbe};

/// [`FileSystemProbe`] backed by `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct StdProbe {
    apparent_size: bool,
}

impl StdProbe {
    /// Create a probe reporting on-disk sizes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report logical file lengths instead of allocated bytes.
    pub fn with_apparent_size(mut self, apparent_size: bool) -> Self {
        self.apparent_size = apparent_size;
        self
    }

    fn entry_from(&self, name: CompactString, path: &Path, link_meta: &Metadata) -> EntryInfo {
        let is_symlink = link_meta.file_type().is_symlink();
        // Directory symlinks are listed as directories so the redirection
        // policy gets to decide about them.
        let is_directory = link_meta.is_dir() || (is_symlink && path.is_dir());
        let size = if is_directory {
            0
        } else if self.apparent_size {
            link_meta.len()
        } else {
            allocated_size(link_meta)
        };
        EntryInfo {
            attributes: Some(attributes_of(&name, link_meta)),
            name,
            is_directory,
            size,
            last_write: link_meta.modified().unwrap_or(UNIX_EPOCH),
        }
    }
}

impl FileSystemProbe for StdProbe {
    fn list_children(&self, path: &Path) -> Result<Vec<EntryInfo>, ProbeError> {
        let read_dir = fs::read_dir(path).map_err(|e| ProbeError::io(path, e))?;
        let entries = read_dir
            .filter_map(|entry| readable(path, entry))
            .filter_map(|entry| {
                let entry_path = entry.path();
                let meta = readable(&entry_path, fs::symlink_metadata(&entry_path))?;
                let name = CompactString::new(entry.file_name().to_string_lossy());
                Some(self.entry_from(name, &entry_path, &meta))
            })
            .collect();
        Ok(entries)
    }

    fn stat(&self, path: &Path) -> Result<EntryInfo, ProbeError> {
        let meta = fs::symlink_metadata(path).map_err(|e| ProbeError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        Ok(self.entry_from(name, path, &meta))
    }

    fn volume_space(&self, root: &Path) -> Option<VolumeSpace> {
        query_volume_space(root)
    }

    fn is_volume_mount_point(&self, path: &Path) -> bool {
        mount_point(path)
    }

    fn is_junction(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| is_redirection(&m) && path.is_dir())
            .unwrap_or(false)
    }
}

/// Entries that cannot be read or stat'ed are left out of the listing.
fn readable<T>(path: &Path, result: io::Result<T>) -> Option<T> {
    result
        .inspect_err(|err| trace!(path = %path.display(), %err, "skipping unreadable entry"))
        .ok()
}

#[cfg(windows)]
fn is_redirection(meta: &Metadata) -> bool {
    const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x400;
    meta.file_type().is_symlink() || meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0
}

#[cfg(not(windows))]
fn is_redirection(meta: &Metadata) -> bool {
    meta.file_type().is_symlink()
}

#[cfg(windows)]
fn attributes_of(_name: &str, meta: &Metadata) -> Attributes {
    const MAPPING: [(u32, Attributes); 7] = [
        (0x1, Attributes::READ_ONLY),
        (0x2, Attributes::HIDDEN),
        (0x4, Attributes::SYSTEM),
        (0x20, Attributes::ARCHIVE),
        (0x400, Attributes::REPARSE_POINT),
        (0x800, Attributes::COMPRESSED),
        (0x4000, Attributes::ENCRYPTED),
    ];
    let raw = meta.file_attributes();
    MAPPING
        .iter()
        .filter(|(bit, _)| raw & bit != 0)
        .fold(Attributes::empty(), |acc, (_, flag)| acc | *flag)
}

#[cfg(not(windows))]
fn attributes_of(name: &str, meta: &Metadata) -> Attributes {
    let mut attributes = Attributes::empty();
    if meta.permissions().readonly() {
        attributes |= Attributes::READ_ONLY;
    }
    if name.starts_with('.') {
        attributes |= Attributes::HIDDEN;
    }
    if meta.file_type().is_symlink() {
        attributes |= Attributes::REPARSE_POINT;
    }
    attributes
}

/// Bytes allocated on disk.
#[cfg(unix)]
fn allocated_size(meta: &Metadata) -> u64 {
    meta.blocks() * 512
}

#[cfg(not(unix))]
fn allocated_size(meta: &Metadata) -> u64 {
    meta.len()
}

#[cfg(unix)]
fn mount_point(path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    match (fs::metadata(path), fs::metadata(parent)) {
        (Ok(here), Ok(above)) => here.dev() != above.dev(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn mount_point(_path: &Path) -> bool {
    false
}

#[cfg(unix)]
fn query_volume_space(root: &Path) -> Option<VolumeSpace> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c = CString::new(root.as_os_str().as_bytes()).ok()?;
    // SAFETY: `c` is a valid NUL-terminated path and `s` is a properly sized,
    // zero-initialised out-parameter.
    let mut s: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c.as_ptr(), &mut s as *mut _) };
    if rc != 0 {
        return None;
    }
    let frsize = s.f_frsize as u128;
    let total = (s.f_blocks as u128).saturating_mul(frsize).min(u64::MAX as u128) as u64;
    let free = (s.f_bavail as u128).saturating_mul(frsize).min(u64::MAX as u128) as u64;
    Some(VolumeSpace::new(total, free))
}

#[cfg(not(unix))]
fn query_volume_space(_root: &Path) -> Option<VolumeSpace> {
    None
}
