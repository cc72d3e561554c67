//! In-memory filesystem probe.
//!
//! Only built for tests and with the `test-util` feature. Given a
//! [`ManualClock`], every listing advances it by a fixed cost, which makes
//! scheduling reproducible.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use compact_str::CompactString;
use spacetree_core::{Attributes, ProbeError, VolumeSpace};

use crate::budget::ManualClock;
use crate::probe::{EntryInfo, FileSystemProbe};

#[derive(Debug, Clone)]
struct MemEntry {
    is_dir: bool,
    size: u64,
    last_write: SystemTime,
    attributes: Attributes,
    junction: bool,
    mount_point: bool,
    unreadable: bool,
}

impl MemEntry {
    fn dir() -> Self {
        Self {
            is_dir: true,
            size: 0,
            last_write: UNIX_EPOCH,
            attributes: Attributes::empty(),
            junction: false,
            mount_point: false,
            unreadable: false,
        }
    }

    fn file(size: u64, last_write: SystemTime) -> Self {
        Self {
            is_dir: false,
            size,
            last_write,
            ..Self::dir()
        }
    }
}

/// A [`FileSystemProbe`] over a map of paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe {
    entries: BTreeMap<PathBuf, MemEntry>,
    volumes: HashMap<PathBuf, VolumeSpace>,
    clock: Option<(Rc<ManualClock>, u64)>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` by `cost` ticks on every listing.
    pub fn with_clock(mut self, clock: Rc<ManualClock>, cost: u64) -> Self {
        self.clock = Some((clock, cost));
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dir_entry(path.as_ref());
        self
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        self.add_file(path, size, UNIX_EPOCH);
        self
    }

    pub fn with_file_at(mut self, path: impl AsRef<Path>, size: u64, last_write: SystemTime) -> Self {
        self.add_file(path, size, last_write);
        self
    }

    /// A directory reached through a junction.
    pub fn with_junction(mut self, path: impl AsRef<Path>) -> Self {
        let entry = self.dir_entry(path.as_ref());
        entry.junction = true;
        entry.attributes |= Attributes::REPARSE_POINT;
        self
    }

    /// A directory another volume is mounted on.
    pub fn with_mount_point(mut self, path: impl AsRef<Path>) -> Self {
        self.dir_entry(path.as_ref()).mount_point = true;
        self
    }

    pub fn with_volume(mut self, root: impl AsRef<Path>, space: VolumeSpace) -> Self {
        self.dir_entry(root.as_ref());
        self.volumes.insert(root.as_ref().to_path_buf(), space);
        self
    }

    /// Add a directory and any missing ancestors.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        self.dir_entry(path.as_ref());
    }

    fn dir_entry(&mut self, path: &Path) -> &mut MemEntry {
        self.ensure_parents(path);
        self.entries
            .entry(path.to_path_buf())
            .or_insert_with(MemEntry::dir)
    }

    /// Add or replace a file and any missing ancestors.
    pub fn add_file(&mut self, path: impl AsRef<Path>, size: u64, last_write: SystemTime) {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.entries
            .insert(path.to_path_buf(), MemEntry::file(size, last_write));
    }

    /// Remove a path and everything below it, volumes included.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.entries.retain(|p, _| !p.starts_with(path));
        self.volumes.retain(|p, _| !p.starts_with(path));
    }

    /// Set the last write time of an existing path.
    pub fn touch(&mut self, path: impl AsRef<Path>, last_write: SystemTime) {
        if let Some(entry) = self.entries.get_mut(path.as_ref()) {
            entry.last_write = last_write;
        }
    }

    /// Make listing `path` fail with a permission error.
    pub fn set_unreadable(&mut self, path: impl AsRef<Path>, unreadable: bool) {
        if let Some(entry) = self.entries.get_mut(path.as_ref()) {
            entry.unreadable = unreadable;
        }
    }

    pub fn set_volume_space(&mut self, root: impl AsRef<Path>, space: VolumeSpace) {
        self.volumes.insert(root.as_ref().to_path_buf(), space);
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut missing: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .take_while(|p| !self.entries.contains_key(*p))
            .map(Path::to_path_buf)
            .collect();
        while let Some(dir) = missing.pop() {
            self.entries.insert(dir, MemEntry::dir());
        }
    }

    fn info(path: &Path, entry: &MemEntry) -> EntryInfo {
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));
        EntryInfo {
            name,
            is_directory: entry.is_dir,
            attributes: Some(entry.attributes),
            size: entry.size,
            last_write: entry.last_write,
        }
    }
}

impl FileSystemProbe for MemoryProbe {
    fn list_children(&self, path: &Path) -> Result<Vec<EntryInfo>, ProbeError> {
        if let Some((clock, cost)) = &self.clock {
            clock.advance(*cost);
        }
        let dir = self
            .entries
            .get(path)
            .filter(|e| e.is_dir)
            .ok_or_else(|| ProbeError::NotFound {
                path: path.to_path_buf(),
            })?;
        if dir.unreadable {
            return Err(ProbeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Ok(self
            .entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, e)| Self::info(p, e))
            .collect())
    }

    fn stat(&self, path: &Path) -> Result<EntryInfo, ProbeError> {
        self.entries
            .get(path)
            .map(|e| Self::info(path, e))
            .ok_or_else(|| ProbeError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn volume_space(&self, root: &Path) -> Option<VolumeSpace> {
        self.volumes.get(root).copied()
    }

    fn is_volume_mount_point(&self, path: &Path) -> bool {
        self.entries.get(path).is_some_and(|e| e.mount_point)
    }

    fn is_junction(&self, path: &Path) -> bool {
        self.entries.get(path).is_some_and(|e| e.junction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_are_created() {
        let probe = MemoryProbe::new().with_file("/r/a/b/c.txt", 3);
        let listing = probe.list_children(Path::new("/r/a")).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "b");
        assert!(listing[0].is_directory);
    }

    #[test]
    fn test_remove_subtree() {
        let mut probe = MemoryProbe::new()
            .with_file("/r/a/x", 1)
            .with_file("/r/b", 2);
        probe.remove("/r/a");
        assert!(probe.stat(Path::new("/r/a/x")).unwrap_err().is_not_found());
        assert_eq!(probe.list_children(Path::new("/r")).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_drops_volume_space() {
        let mut probe = MemoryProbe::new().with_volume("/v", VolumeSpace::new(100, 40));
        assert!(probe.volume_space(Path::new("/v")).is_some());
        probe.remove("/v");
        assert_eq!(probe.volume_space(Path::new("/v")), None);
    }

    #[test]
    fn test_listing_advances_clock() {
        let clock = Rc::new(ManualClock::new());
        let probe = MemoryProbe::new()
            .with_dir("/r")
            .with_clock(clock.clone(), 3);
        probe.list_children(Path::new("/r")).unwrap();
        probe.list_children(Path::new("/r")).unwrap();
        assert_eq!(clock.ticks(), 6);
    }

    #[test]
    fn test_unreadable_listing() {
        let mut probe = MemoryProbe::new().with_dir("/r/locked");
        probe.set_unreadable("/r/locked", true);
        let err = probe.list_children(Path::new("/r/locked")).unwrap_err();
        assert!(matches!(err, ProbeError::PermissionDenied { .. }));
    }
}
