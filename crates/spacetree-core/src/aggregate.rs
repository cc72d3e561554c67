//! Upward propagation of subtree totals.
//!
//! Every operation here starts at the given node and walks to the root, so
//! each costs O(depth). Callers apply exactly one call per event: a leaf
//! discovered, a listing finished, a child removed.

use std::time::SystemTime;

use crate::node::{Node, NodeId};
use crate::tree::ItemTree;

/// What a node adds to each of its ancestors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contribution {
    pub size: u64,
    pub files: u64,
    /// Includes the node itself when it is a followed directory.
    pub subdirs: u64,
    pub read_jobs: u64,
}

impl ItemTree {
    /// Add `delta` bytes to `id` and its ancestors.
    pub fn add_size(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| node.size += delta);
    }

    /// Remove `delta` bytes from `id` and its ancestors, saturating at zero.
    pub fn sub_size(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| node.size = node.size.saturating_sub(delta));
    }

    /// Count `delta` more files at `id` and its ancestors.
    pub fn add_files(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| node.file_count += delta);
    }

    /// Count `delta` fewer files at `id` and its ancestors, saturating at zero.
    pub fn sub_files(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| {
            node.file_count = node.file_count.saturating_sub(delta)
        });
    }

    /// Count `delta` more subdirectories at `id` and its ancestors.
    pub fn add_subdirs(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| node.subdir_count += delta);
    }

    /// Count `delta` fewer subdirectories at `id` and its ancestors, saturating at zero.
    pub fn sub_subdirs(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| {
            node.subdir_count = node.subdir_count.saturating_sub(delta)
        });
    }

    /// Open `delta` listings at `id` and its ancestors.
    pub fn add_read_jobs(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| node.pending_read_jobs += delta);
    }

    /// Close `delta` listings at `id` and its ancestors, saturating at zero.
    pub fn sub_read_jobs(&mut self, id: NodeId, delta: u64) {
        if delta == 0 {
            return;
        }
        self.for_chain(id, |node| {
            node.pending_read_jobs = node.pending_read_jobs.saturating_sub(delta)
        });
    }

    /// Raise `last_change` to at least `time` along the chain. Stops at the
    /// first node already at or past `time`, since its ancestors are too.
    pub fn raise_last_change(&mut self, id: NodeId, time: SystemTime) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = &mut self[cur];
            if node.last_change >= time {
                break;
            }
            node.last_change = time;
            current = node.parent;
        }
    }

    /// Re-derive `last_change` at `id` from its own timestamp and remaining
    /// children, then upward until a node's value no longer changes. Used
    /// after removals, where a max cannot be decremented.
    pub fn recompute_last_change(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let derived = self[cur]
                .children
                .iter()
                .map(|c| self[*c].last_change)
                .fold(self[cur].own_time, SystemTime::max);
            let node = &mut self[cur];
            if node.last_change == derived && cur != id {
                break;
            }
            node.last_change = derived;
            current = node.parent;
        }
    }

    /// Totals `id` currently adds to its ancestors.
    pub fn contribution(&self, id: NodeId) -> Contribution {
        let node = &self[id];
        Contribution {
            size: node.size,
            files: node.file_count,
            subdirs: node.subdir_count + u64::from(node.counts_as_subdir()),
            read_jobs: node.pending_read_jobs,
        }
    }

    /// Charge a contribution to `id` and its ancestors.
    pub fn add_contribution(&mut self, id: NodeId, c: Contribution) {
        self.add_size(id, c.size);
        self.add_files(id, c.files);
        self.add_subdirs(id, c.subdirs);
        self.add_read_jobs(id, c.read_jobs);
    }

    /// Remove a contribution from `id` and its ancestors.
    pub fn sub_contribution(&mut self, id: NodeId, c: Contribution) {
        self.sub_size(id, c.size);
        self.sub_files(id, c.files);
        self.sub_subdirs(id, c.subdirs);
        self.sub_read_jobs(id, c.read_jobs);
    }

    /// Net a child's totals out of its ancestors, then unlink and free it.
    /// Returns the former parent.
    pub fn remove_child(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent()?;
        let c = self.contribution(id);
        self.sub_contribution(parent, c);
        self.detach(id);
        self.recompute_last_change(parent);
        Some(parent)
    }

    fn for_chain(&mut self, id: NodeId, mut f: impl FnMut(&mut Node)) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let node = &mut self[cur];
            f(node);
            current = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_add_size_reaches_root() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        let sub = tree.insert_child(root, Node::directory("sub", at(1), None));
        tree.add_size(sub, 40);
        tree.sub_size(sub, 15);
        assert_eq!(tree[sub].size, 25);
        assert_eq!(tree[root].size, 25);
    }

    #[test]
    fn test_subtract_saturates() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        tree.add_files(root, 2);
        tree.sub_files(root, 5);
        assert_eq!(tree[root].file_count, 0);
    }

    #[test]
    fn test_raise_last_change_is_monotonic() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        let sub = tree.insert_child(root, Node::directory("sub", at(1), None));
        tree.raise_last_change(sub, at(50));
        tree.raise_last_change(sub, at(20));
        assert_eq!(tree[sub].last_change, at(50));
        assert_eq!(tree[root].last_change, at(50));
    }

    #[test]
    fn test_remove_child_recomputes_last_change() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        tree[root].own_time = at(5);
        let old = tree.insert_child(root, Node::file("old", 10, at(10), None));
        tree.add_size(root, 10);
        tree.add_files(root, 1);
        tree.raise_last_change(root, at(10));
        let new = tree.insert_child(root, Node::file("new", 7, at(90), None));
        tree.add_size(root, 7);
        tree.add_files(root, 1);
        tree.raise_last_change(root, at(90));

        assert_eq!(tree.remove_child(new), Some(root));
        assert_eq!(tree[root].size, 10);
        assert_eq!(tree[root].file_count, 1);
        assert_eq!(tree[root].last_change, at(10));

        tree.remove_child(old);
        assert_eq!(tree[root].last_change, at(5));
    }

    #[test]
    fn test_contribution_counts_followed_directory() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        let sub = tree.insert_child(root, Node::directory("sub", at(1), None));
        let junction = tree.insert_child(root, Node::excluded_directory("j", at(1), None));
        assert_eq!(tree.contribution(sub).subdirs, 1);
        assert_eq!(tree.contribution(sub).read_jobs, 1);
        assert_eq!(tree.contribution(junction), Contribution::default());
    }
}
