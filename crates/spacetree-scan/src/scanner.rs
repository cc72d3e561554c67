//! Cooperative, time-sliced tree scanner.
//!
//! A host calls [`Scanner::work`] repeatedly with a bounded [`WorkBudget`].
//! Each call lists at most a few directories, charges every discovery to the
//! tree through the aggregation methods, and returns as soon as the budget
//! expires. Between calls the tree is always consistent, so stopping is just
//! not calling `work` again.

use std::path::Path;

use spacetree_core::{ItemTree, Node, NodeId, NodeKind, ScanPolicy, ScanWarning};
use tracing::{debug, trace, warn};

use crate::budget::{Clock, MonotonicClock, WorkBudget};
use crate::observer::{NoopObserver, ScanObserver};
use crate::probe::{EntryInfo, FileSystemProbe};
use crate::synthetic;

/// Scans an [`ItemTree`] through a [`FileSystemProbe`].
pub struct Scanner<P> {
    pub(crate) probe: P,
    pub(crate) policy: ScanPolicy,
    pub(crate) observer: Box<dyn ScanObserver>,
    pub(crate) warnings: Vec<ScanWarning>,
}

impl<P: FileSystemProbe> Scanner<P> {
    /// Create a scanner with the given probe and policy.
    pub fn new(probe: P, policy: ScanPolicy) -> Self {
        Self {
            probe,
            policy,
            observer: Box::new(NoopObserver),
            warnings: Vec::new(),
        }
    }

    /// Report scan events to `observer`.
    pub fn with_observer(mut self, observer: impl ScanObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Mutable access to the probe, e.g. to reconfigure an in-memory one.
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Non-fatal problems seen so far.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Drain the collected warnings.
    pub fn take_warnings(&mut self) -> Vec<ScanWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Advance the scan of the whole tree. Returns whether the root is Done.
    pub fn work(&mut self, tree: &mut ItemTree, budget: &mut WorkBudget<'_>) -> bool {
        let root = tree.root();
        self.work_node(tree, root, budget)
    }

    /// Run one slice of `ticks` on `clock`.
    pub fn work_for(&mut self, tree: &mut ItemTree, clock: &dyn Clock, ticks: u64) -> bool {
        let mut budget = WorkBudget::new(clock);
        budget.start(ticks);
        self.work(tree, &mut budget)
    }

    /// Scan until the root is Done.
    pub fn scan_to_completion(&mut self, tree: &mut ItemTree) {
        let clock = MonotonicClock::new();
        let mut budget = WorkBudget::new(&clock);
        budget.start_unbounded();
        self.work(tree, &mut budget);
    }

    /// Advance the scan of the subtree at `id`. Returns whether it is Done.
    pub fn work_node(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        budget: &mut WorkBudget<'_>,
    ) -> bool {
        if tree[id].done {
            return true;
        }
        let started = budget.now();

        if !tree[id].read_done {
            self.read_node(tree, id);
        }

        loop {
            if tree.is_complete(id) {
                self.finish_node(tree, id);
                break;
            }
            if budget.is_expired() {
                break;
            }
            let Some(child) = least_worked_child(tree, id) else {
                break;
            };
            self.work_node(tree, child, budget);
        }

        tree[id].ticks_worked += budget.now().saturating_sub(started);
        tree[id].done
    }

    /// Mark a complete node Done and run completion hooks.
    pub(crate) fn finish_node(&mut self, tree: &mut ItemTree, id: NodeId) {
        tree[id].done = true;
        if tree[id].kind == NodeKind::Volume {
            synthetic::update_synthetic_items(tree, id, &self.policy);
        }
        self.observer.node_done(tree, id);
    }

    /// Mark every complete ancestor chain node Done, starting at `id`.
    pub(crate) fn settle(&mut self, tree: &mut ItemTree, id: NodeId) {
        let chain: Vec<NodeId> = tree.chain(id).collect();
        for current in chain {
            if tree[current].done {
                continue;
            }
            if !tree.is_complete(current) {
                break;
            }
            self.finish_node(tree, current);
        }
    }

    /// Perform the node's own listing. Atomic: never split across slices.
    pub(crate) fn read_node(&mut self, tree: &mut ItemTree, id: NodeId) {
        let path = tree.path_of(id);

        if tree[id].path.is_some() {
            self.stat_root(tree, id, &path);
        }
        if tree[id].kind == NodeKind::Volume {
            self.query_volume_space(tree, id, &path);
        }

        match self.probe.list_children(&path) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "listed directory");
                self.populate(tree, id, &path, entries);
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "listing failed, keeping empty node");
                self.observer.listing_failed(&path, &err);
                self.warnings.push(ScanWarning::listing_failed(&err));
            }
        }

        tree[id].read_done = true;
        tree.sub_read_jobs(id, 1);
    }

    fn stat_root(&mut self, tree: &mut ItemTree, id: NodeId, path: &Path) {
        match self.probe.stat(path) {
            Ok(info) => {
                tree[id].own_time = info.last_write;
                tree[id].attributes = info.attributes;
                tree.raise_last_change(id, info.last_write);
            }
            Err(err) => trace!(path = %path.display(), %err, "root metadata unavailable"),
        }
    }

    pub(crate) fn query_volume_space(&mut self, tree: &mut ItemTree, id: NodeId, path: &Path) {
        let space = match self.probe.volume_space(path) {
            Some(space) => space,
            None => {
                debug!(path = %path.display(), "volume space unavailable");
                self.warnings.push(ScanWarning::volume_query_failed(path));
                Default::default()
            }
        };
        tree[id].space = Some(space);
    }

    /// Create children for a listing and charge them upward.
    ///
    /// Sizes and timestamps are charged per child as it is inserted; file
    /// and subdirectory counts once for the whole listing.
    fn populate(&mut self, tree: &mut ItemTree, id: NodeId, path: &Path, entries: Vec<EntryInfo>) {
        let group = self.policy.group_files
            && entries.iter().any(|e| e.is_directory)
            && entries.iter().any(|e| !e.is_directory);
        let file_parent = if group {
            tree.insert_child(id, Node::files_group())
        } else {
            id
        };

        let mut files = 0;
        let mut subdirs = 0;
        for entry in entries {
            if entry.is_directory {
                if self.add_directory(tree, id, path, entry) {
                    subdirs += 1;
                }
            } else {
                self.add_file(tree, file_parent, entry);
                files += 1;
            }
        }

        tree.add_subdirs(id, subdirs);
        tree.add_files(file_parent, files);
    }

    /// Insert a File leaf and charge its size and time to the chain.
    pub(crate) fn add_file(&mut self, tree: &mut ItemTree, parent: NodeId, entry: EntryInfo) {
        let size = entry.size;
        let time = entry.last_write;
        let child = tree.insert_child(parent, Node::file(entry.name, size, time, entry.attributes));
        tree.add_size(parent, size);
        tree.raise_last_change(parent, time);
        self.observer.file_found(tree, child);
    }

    /// Insert a Directory child. Returns whether it counts as a subdirectory
    /// (it does unless the redirection policy excluded it).
    fn add_directory(&mut self, tree: &mut ItemTree, parent: NodeId, path: &Path, entry: EntryInfo) -> bool {
        let child_path = path.join(entry.name.as_str());
        let time = entry.last_write;
        let followed = !self.is_excluded(&child_path, &entry);
        let node = if followed {
            Node::directory(entry.name, time, entry.attributes)
        } else {
            trace!(path = %child_path.display(), "not following redirection");
            Node::excluded_directory(entry.name, time, entry.attributes)
        };
        tree.insert_child(parent, node);
        if followed {
            tree.add_read_jobs(parent, 1);
        }
        tree.raise_last_change(parent, time);
        followed
    }

    /// Mount-point and junction policy for a directory entry.
    pub(crate) fn is_excluded(&self, path: &Path, entry: &EntryInfo) -> bool {
        let unfollowed_mount =
            !self.policy.follow_mount_points && self.probe.is_volume_mount_point(path);
        let unfollowed_junction = !self.policy.follow_junctions
            && self.probe.is_reparse_point(entry.attributes)
            && self.probe.is_junction(path);
        unfollowed_mount || unfollowed_junction
    }
}

/// Not-done child with the fewest ticks; ties go to the earlier child.
fn least_worked_child(tree: &ItemTree, id: NodeId) -> Option<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .filter(|c| !tree[*c].done)
        .min_by_key(|c| tree[*c].ticks_worked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::ManualClock;
    use crate::memory::MemoryProbe;
    use std::rc::Rc;

    #[test]
    fn test_least_worked_prefers_earlier_on_ties() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        let a = tree.insert_child(root, Node::directory("a", std::time::UNIX_EPOCH, None));
        let b = tree.insert_child(root, Node::directory("b", std::time::UNIX_EPOCH, None));
        assert_eq!(least_worked_child(&tree, root), Some(a));
        tree[a].ticks_worked = 3;
        assert_eq!(least_worked_child(&tree, root), Some(b));
        tree[b].done = true;
        assert_eq!(least_worked_child(&tree, root), Some(a));
    }

    #[test]
    fn test_expired_budget_still_lists_once() {
        let clock = Rc::new(ManualClock::new());
        let probe = MemoryProbe::new()
            .with_file("/r/a/x", 1)
            .with_file("/r/b/y", 2)
            .with_clock(clock.clone(), 1);
        let mut scanner = Scanner::new(probe, ScanPolicy::default());
        let mut tree = ItemTree::new_directory_root("/r");

        assert!(!scanner.work_for(&mut tree, &*clock, 0));
        let root = tree.root();
        assert!(tree[root].read_done);
        assert_eq!(tree[root].subdir_count, 2);
        assert_eq!(tree[root].pending_read_jobs, 2);
        assert_eq!(tree[root].size, 0);
    }

    #[test]
    fn test_empty_directory_is_done_after_listing() {
        let probe = MemoryProbe::new().with_dir("/r");
        let mut scanner = Scanner::new(probe, ScanPolicy::default());
        let mut tree = ItemTree::new_directory_root("/r");
        scanner.scan_to_completion(&mut tree);
        let root = tree.root();
        assert!(tree[root].done);
        assert_eq!(tree[root].pending_read_jobs, 0);
    }
}
