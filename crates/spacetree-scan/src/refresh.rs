//! Re-scanning of already scanned nodes.
//!
//! A refresh first nets the node's whole contribution out of its ancestors,
//! discards its children, then asks the probe about the node again. If the
//! item is gone, or a file now stands where a directory was (or the other way
//! round), the node is detached and [`RefreshOutcome::Deleted`] names
//! the parent, so the host can repoint selections or zoom targets that
//! referred to the removed node. Otherwise the node is rebuilt with the same
//! primitives as the initial scan.

use spacetree_core::{ItemTree, NodeId, NodeKind, ScanWarning, WarningKind};
use tracing::debug;

use crate::budget::WorkBudget;
use crate::probe::{EntryInfo, FileSystemProbe};
use crate::scanner::Scanner;
use crate::synthetic;

/// Result of [`Scanner::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The node exists and was re-scanned (possibly only partly, if the
    /// budget ran out; continue with `work`).
    Refreshed,
    /// The item no longer exists. The node has been detached and freed.
    Deleted { parent: NodeId },
}

impl<P: FileSystemProbe> Scanner<P> {
    /// Re-scan `id` and everything below it.
    pub fn refresh(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        budget: &mut WorkBudget<'_>,
    ) -> RefreshOutcome {
        let outcome = match tree[id].kind {
            NodeKind::Computer => self.refresh_computer(tree, id, budget),
            NodeKind::FreeSpace | NodeKind::Unknown => self.refresh_synthetic(tree, id),
            NodeKind::File => self.refresh_file(tree, id),
            NodeKind::FilesGroup => self.refresh_files_group(tree, id, budget),
            NodeKind::Volume | NodeKind::Directory => self.refresh_container(tree, id, budget),
        };
        debug!(?id, ?outcome, "refresh finished");
        outcome
    }

    fn refresh_computer(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        budget: &mut WorkBudget<'_>,
    ) -> RefreshOutcome {
        let volumes: Vec<NodeId> = tree
            .children(id)
            .iter()
            .copied()
            .filter(|c| tree[*c].kind == NodeKind::Volume)
            .collect();
        // Deleted volumes are already detached; nothing else refers to them.
        for volume in volumes {
            self.refresh(tree, volume, budget);
        }
        self.settle(tree, id);
        RefreshOutcome::Refreshed
    }

    fn refresh_synthetic(&mut self, tree: &mut ItemTree, id: NodeId) -> RefreshOutcome {
        let Some(volume) = tree.volume_of(id) else {
            return RefreshOutcome::Refreshed;
        };
        let path = tree.path_of(volume);
        self.query_volume_space(tree, volume, &path);
        if tree[volume].done {
            synthetic::update_synthetic_items(tree, volume, &self.policy);
        }
        RefreshOutcome::Refreshed
    }

    fn refresh_file(&mut self, tree: &mut ItemTree, id: NodeId) -> RefreshOutcome {
        let Some(parent) = tree.parent(id) else {
            return RefreshOutcome::Refreshed;
        };
        let path = tree.path_of(id);
        let before = tree.contribution(id);
        tree.sub_contribution(parent, before);

        let gone = match self.probe.stat(&path) {
            Err(err) if err.is_not_found() => true,
            // A directory now sits where the file was.
            Ok(info) if info.is_directory => true,
            Err(err) => {
                self.warnings.push(ScanWarning::new(
                    &path,
                    err.to_string(),
                    WarningKind::MetadataError,
                ));
                false
            }
            Ok(info) => {
                let node = &mut tree[id];
                node.size = info.size;
                node.own_time = info.last_write;
                node.last_change = info.last_write;
                node.attributes = info.attributes;
                false
            }
        };
        if gone {
            tree.detach(id);
            tree.recompute_last_change(parent);
            self.resync_volume(tree, parent);
            return RefreshOutcome::Deleted { parent };
        }

        let after = tree.contribution(id);
        tree.add_contribution(parent, after);
        tree.recompute_last_change(parent);
        self.resync_volume(tree, parent);
        RefreshOutcome::Refreshed
    }

    fn refresh_files_group(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        budget: &mut WorkBudget<'_>,
    ) -> RefreshOutcome {
        let Some(parent) = tree.parent(id) else {
            return RefreshOutcome::Refreshed;
        };
        let path = tree.path_of(id);
        let before = tree.contribution(id);
        tree.sub_contribution(parent, before);
        tree.clear_children(id);
        reset_totals(tree, id);
        tree.recompute_last_change(parent);

        match self.probe.list_children(&path) {
            Ok(entries) => {
                let files: Vec<EntryInfo> =
                    entries.into_iter().filter(|e| !e.is_directory).collect();
                let count = files.len() as u64;
                for entry in files {
                    self.add_file(tree, id, entry);
                }
                tree.add_files(id, count);
                self.resync_volume(tree, id);
                RefreshOutcome::Refreshed
            }
            // The directory holding the group vanished: refresh that instead.
            Err(err) if err.is_not_found() => self.refresh(tree, parent, budget),
            Err(err) => {
                self.warnings.push(ScanWarning::listing_failed(&err));
                RefreshOutcome::Refreshed
            }
        }
    }

    fn refresh_container(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        budget: &mut WorkBudget<'_>,
    ) -> RefreshOutcome {
        let parent = tree.parent(id);
        let path = tree.path_of(id);

        let before = tree.contribution(id);
        if let Some(parent) = parent {
            tree.sub_contribution(parent, before);
        }
        tree.clear_children(id);
        reset_totals(tree, id);
        tree.unsettle(id);

        let info = match self.probe.stat(&path) {
            Err(err) if err.is_not_found() => {
                let warning = ScanWarning::listing_failed(&err);
                return self.container_gone(tree, id, parent, warning);
            }
            // A file now sits where the directory was.
            Ok(found) if !found.is_directory => {
                let warning =
                    ScanWarning::new(&path, "Not a directory", WarningKind::ListingFailed);
                return self.container_gone(tree, id, parent, warning);
            }
            Err(err) => {
                self.warnings.push(ScanWarning::new(
                    &path,
                    err.to_string(),
                    WarningKind::MetadataError,
                ));
                None
            }
            Ok(found) => Some(found),
        };

        let excluded = match (&info, parent) {
            (Some(entry), Some(_)) if tree[id].kind == NodeKind::Directory => {
                self.is_excluded(&path, entry)
            }
            _ => false,
        };

        let node = &mut tree[id];
        if let Some(entry) = info {
            node.own_time = entry.last_write;
            node.attributes = entry.attributes;
        }
        node.last_change = node.own_time;
        node.excluded = excluded;
        node.read_done = excluded;
        node.done = excluded;
        node.pending_read_jobs = u64::from(!excluded);

        if let Some(parent) = parent {
            let after = tree.contribution(id);
            tree.add_contribution(parent, after);
            tree.recompute_last_change(parent);
        }

        if !excluded {
            self.work_node(tree, id, budget);
        }
        if let Some(parent) = parent {
            self.settle(tree, parent);
        }
        RefreshOutcome::Refreshed
    }

    /// Drop a directory or volume whose item disappeared. A root cannot be
    /// detached, so it stays as an empty, Done node and `warning` is kept.
    fn container_gone(
        &mut self,
        tree: &mut ItemTree,
        id: NodeId,
        parent: Option<NodeId>,
        warning: ScanWarning,
    ) -> RefreshOutcome {
        if let Some(parent) = parent {
            tree.detach(id);
            tree.recompute_last_change(parent);
            self.settle(tree, parent);
            return RefreshOutcome::Deleted { parent };
        }
        self.warnings.push(warning);
        if tree[id].kind == NodeKind::Volume {
            let path = tree.path_of(id);
            self.query_volume_space(tree, id, &path);
        }
        tree[id].read_done = true;
        self.finish_node(tree, id);
        RefreshOutcome::Refreshed
    }
}

impl<P: FileSystemProbe> Scanner<P> {
    /// Recompute the synthetic items of a Done volume above `id` after its
    /// real size changed in place.
    fn resync_volume(&mut self, tree: &mut ItemTree, id: NodeId) {
        if let Some(volume) = tree.volume_of(id) {
            if tree[volume].done {
                synthetic::update_synthetic_items(tree, volume, &self.policy);
            }
        }
    }
}

/// Zero the aggregates of a node whose children were just discarded.
fn reset_totals(tree: &mut ItemTree, id: NodeId) {
    let node = &mut tree[id];
    if !node.kind.is_leaf() {
        node.size = 0;
        node.file_count = 0;
        node.subdir_count = 0;
    }
    node.pending_read_jobs = 0;
    node.ticks_worked = 0;
    node.last_change = node.own_time;
}
