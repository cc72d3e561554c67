//! Read-only capability views over tree nodes.
//!
//! Presentation layers (list views, treemaps) see nodes only through these
//! traits, implemented on a borrowed [`NodeRef`] handle, so the tree itself
//! stays free of rendering concerns.

use std::time::SystemTime;

use crate::node::{Attributes, Node, NodeId, NodeKind};
use crate::tree::ItemTree;

/// Borrowed handle to one node of a tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a ItemTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn new(tree: &'a ItemTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        &self.tree[self.id]
    }

    pub fn tree(&self) -> &'a ItemTree {
        self.tree
    }

    /// Handles to the direct children, in tree order.
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree[self.id]
            .children()
            .iter()
            .map(move |c| NodeRef::new(tree, *c))
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.node().name)
            .finish()
    }
}

/// What a list view needs to show one row.
pub trait Presentable {
    fn display_name(&self) -> &str;
    fn kind(&self) -> NodeKind;
    fn size(&self) -> u64;
    fn item_count(&self) -> u64;
    fn last_change(&self) -> SystemTime;
    fn attributes(&self) -> Option<Attributes>;
    /// Share of the parent's size in `0.0..=1.0`.
    fn fraction_of_parent(&self) -> f64;
    fn is_done(&self) -> bool;
}

/// What a treemap layout needs from an item.
pub trait LayoutItem: Sized {
    fn layout_size(&self) -> u64;
    fn layout_children(&self) -> Vec<Self>;
}

impl Presentable for NodeRef<'_> {
    fn display_name(&self) -> &str {
        self.node().name.as_str()
    }

    fn kind(&self) -> NodeKind {
        self.node().kind
    }

    fn size(&self) -> u64 {
        self.node().size
    }

    fn item_count(&self) -> u64 {
        let node = self.node();
        node.file_count + node.subdir_count
    }

    fn last_change(&self) -> SystemTime {
        self.node().last_change
    }

    fn attributes(&self) -> Option<Attributes> {
        self.node().attributes
    }

    fn fraction_of_parent(&self) -> f64 {
        match self.node().parent() {
            Some(parent) if self.tree[parent].size > 0 => {
                self.node().size as f64 / self.tree[parent].size as f64
            }
            Some(_) => 0.0,
            None => 1.0,
        }
    }

    fn is_done(&self) -> bool {
        self.node().done
    }
}

impl LayoutItem for NodeRef<'_> {
    fn layout_size(&self) -> u64 {
        self.node().size
    }

    fn layout_children(&self) -> Vec<Self> {
        self.children().filter(|c| c.layout_size() > 0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_presentable_fraction() {
        let mut tree = ItemTree::new_directory_root("/r");
        let root = tree.root();
        let a = tree.insert_child(root, Node::file("a", 30, UNIX_EPOCH, None));
        tree.add_size(root, 30);
        tree.add_files(root, 1);
        let b = tree.insert_child(root, Node::file("b", 0, UNIX_EPOCH, None));
        tree.add_files(root, 1);

        let view = NodeRef::new(&tree, a);
        assert_eq!(view.display_name(), "a");
        assert!((view.fraction_of_parent() - 1.0).abs() < f64::EPSILON);
        assert_eq!(NodeRef::new(&tree, root).item_count(), 2);

        // Zero-sized items take no layout area.
        let children = NodeRef::new(&tree, root).layout_children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id(), a);
        assert_ne!(children[0].id(), b);
    }
}
