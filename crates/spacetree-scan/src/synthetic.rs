//! Free-space and unknown-space items of volume roots.
//!
//! Once a volume is Done its children account for some number of real
//! bytes. The FreeSpace leaf shows the volume's free bytes; the Unknown leaf
//! shows what the volume reports as used but the scan could not see
//! (unreadable folders, metadata, other users' files).

use spacetree_core::{ItemTree, Node, NodeId, NodeKind, ScanPolicy, VolumeSpace};

/// The volume's synthetic child of `kind`, if present.
pub fn synthetic_child(tree: &ItemTree, volume: NodeId, kind: NodeKind) -> Option<NodeId> {
    tree.children(volume)
        .iter()
        .copied()
        .find(|c| tree[*c].kind == kind)
}

/// Bytes accounted for by real items below `volume`.
pub fn real_size(tree: &ItemTree, volume: NodeId) -> u64 {
    let synthetic: u64 = tree
        .children(volume)
        .iter()
        .filter(|c| tree[**c].kind.is_synthetic())
        .map(|c| tree[*c].size)
        .sum();
    tree[volume].size.saturating_sub(synthetic)
}

/// Unknown bytes: used according to the volume, minus what was found.
pub fn unknown_size(space: VolumeSpace, real: u64) -> u64 {
    space.used().saturating_sub(real)
}

/// Replace the volume's FreeSpace and Unknown leaves with fresh ones
/// reflecting its stored [`VolumeSpace`] and the current real size.
///
/// Items disabled by `policy` are removed and not re-created.
pub fn update_synthetic_items(tree: &mut ItemTree, volume: NodeId, policy: &ScanPolicy) {
    for kind in [NodeKind::FreeSpace, NodeKind::Unknown] {
        if let Some(existing) = synthetic_child(tree, volume, kind) {
            tree.remove_child(existing);
        }
    }

    let space = tree[volume].space.unwrap_or_default();
    let real = real_size(tree, volume);

    if policy.show_free_space {
        insert_leaf(tree, volume, NodeKind::FreeSpace, space.free);
    }
    if policy.show_unknown {
        insert_leaf(tree, volume, NodeKind::Unknown, unknown_size(space, real));
    }
}

fn insert_leaf(tree: &mut ItemTree, volume: NodeId, kind: NodeKind, size: u64) {
    tree.insert_child(volume, Node::synthetic(kind, size));
    tree.add_size(volume, size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn volume_with_real_bytes(real: u64, space: VolumeSpace) -> ItemTree {
        let mut tree = ItemTree::new_volume_root("/mnt/v", "V");
        let root = tree.root();
        tree[root].space = Some(space);
        tree.insert_child(root, Node::file("data", real, UNIX_EPOCH, None));
        tree.add_size(root, real);
        tree.add_files(root, 1);
        tree
    }

    #[test]
    fn test_unknown_is_used_minus_real() {
        let mut tree = volume_with_real_bytes(50, VolumeSpace::new(100, 40));
        let root = tree.root();
        update_synthetic_items(&mut tree, root, &ScanPolicy::default());

        let unknown = synthetic_child(&tree, root, NodeKind::Unknown).unwrap();
        let free = synthetic_child(&tree, root, NodeKind::FreeSpace).unwrap();
        assert_eq!(tree[unknown].size, 10);
        assert_eq!(tree[free].size, 40);
        assert_eq!(tree[root].size, 100);
        assert_eq!(tree[root].file_count, 1);
        assert_eq!(real_size(&tree, root), 50);
    }

    #[test]
    fn test_update_replaces_existing_items() {
        let mut tree = volume_with_real_bytes(50, VolumeSpace::new(100, 40));
        let root = tree.root();
        let policy = ScanPolicy::default();
        update_synthetic_items(&mut tree, root, &policy);
        tree[root].space = Some(VolumeSpace::new(100, 30));
        update_synthetic_items(&mut tree, root, &policy);

        assert_eq!(tree.children(root).len(), 3);
        let unknown = synthetic_child(&tree, root, NodeKind::Unknown).unwrap();
        assert_eq!(tree[unknown].size, 20);
        assert_eq!(tree[root].size, 100);
    }

    #[test]
    fn test_disabled_items_are_removed() {
        let mut tree = volume_with_real_bytes(50, VolumeSpace::new(100, 40));
        let root = tree.root();
        update_synthetic_items(&mut tree, root, &ScanPolicy::default());

        let policy = ScanPolicy::builder()
            .show_free_space(false)
            .show_unknown(false)
            .build()
            .unwrap();
        update_synthetic_items(&mut tree, root, &policy);
        assert_eq!(tree.children(root).len(), 1);
        assert_eq!(tree[root].size, 50);
    }

    #[test]
    fn test_real_size_exceeding_used_gives_zero_unknown() {
        assert_eq!(unknown_size(VolumeSpace::new(100, 40), 75), 0);
        assert_eq!(unknown_size(VolumeSpace::default(), 75), 0);
    }
}
