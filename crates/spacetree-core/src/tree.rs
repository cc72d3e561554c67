//! Arena-backed item tree.

use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use compact_str::CompactString;

use crate::node::{Node, NodeId, NodeKind};

/// Owns every node of one scan. Children are owned through the parent's
/// `children` list; `parent` links are plain indices.
#[derive(Debug, Clone)]
pub struct ItemTree {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: NodeId,
    live: usize,
}

impl ItemTree {
    fn with_root(root: Node) -> Self {
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
            live: 1,
        }
    }

    /// Tree rooted at a plain directory.
    pub fn new_directory_root(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut root = Node::directory(
            CompactString::new(path.to_string_lossy()),
            std::time::UNIX_EPOCH,
            None,
        );
        root.path = Some(path);
        Self::with_root(root)
    }

    /// Tree rooted at a single volume.
    pub fn new_volume_root(path: impl Into<PathBuf>, label: &str) -> Self {
        Self::with_root(Node::volume(label, path))
    }

    /// Tree rooted at a Computer; seed it with [`ItemTree::add_volume`].
    pub fn new_computer(name: impl Into<CompactString>) -> Self {
        let mut root = Node::computer(name);
        // Nothing to wait for until a volume is seeded.
        root.done = true;
        Self::with_root(root)
    }

    /// Seed a volume below a Computer root.
    pub fn add_volume(&mut self, computer: NodeId, path: impl Into<PathBuf>, label: &str) -> NodeId {
        let id = self.insert_child(computer, Node::volume(label, path));
        self.add_read_jobs(computer, 1);
        self.unsettle(computer);
        id
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no node is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Get a node, `None` if the slot was freed.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to a node, `None` if the slot was freed.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Children of `id` in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    /// Parent of `id`, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    /// Parent chain, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: self[id].parent,
        }
    }

    /// `id` followed by its ancestors.
    pub fn chain(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            current: Some(id),
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![id],
        }
    }

    /// Append a child and link it to `parent`. No aggregates are touched;
    /// the caller charges them.
    pub fn insert_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Some(node));
                id
            }
        };
        self.live += 1;
        self[parent].children.push(id);
        id
    }

    /// Unlink `id` from its parent and free its whole subtree. Aggregates are
    /// not touched; net the node's [`contribution`](ItemTree::contribution)
    /// out first. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(id)?.parent?;
        self[parent].children.retain(|c| *c != id);
        self.free_subtree(id);
        Some(parent)
    }

    /// Free every descendant of `id`, leaving `id` childless.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self[id].children);
        for child in children {
            self.free_subtree(child);
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.slots[current.index()].take() {
                stack.extend(node.children);
                self.free.push(current);
                self.live -= 1;
            }
        }
    }

    /// Filesystem path of a node, built from the nearest ancestor carrying an
    /// absolute path. FilesGroup nodes share their parent's path. Computer
    /// nodes have no path and yield an empty one.
    pub fn path_of(&self, id: NodeId) -> PathBuf {
        let mut segments: Vec<&str> = Vec::new();
        let mut base: Option<&Path> = None;
        for current in self.chain(id) {
            let node = &self[current];
            if let Some(path) = node.path.as_deref() {
                base = Some(path);
                break;
            }
            match node.kind {
                NodeKind::Directory | NodeKind::File => segments.push(node.name.as_str()),
                _ => {}
            }
        }
        let mut path = base.map(Path::to_path_buf).unwrap_or_default();
        for segment in segments.iter().rev() {
            path.push(segment);
        }
        path
    }

    /// Nearest Volume at or above `id`.
    pub fn volume_of(&self, id: NodeId) -> Option<NodeId> {
        self.chain(id).find(|n| self[*n].kind == NodeKind::Volume)
    }

    /// Clear `done` on `id` and every ancestor so the next `Work` call revisits
    /// them.
    pub fn unsettle(&mut self, id: NodeId) {
        let chain: Vec<NodeId> = self.chain(id).collect();
        for current in chain {
            self[current].done = false;
        }
    }

    /// Whether the node's own listing is finished and all children are Done.
    pub fn is_complete(&self, id: NodeId) -> bool {
        let node = &self[id];
        node.read_done && node.children.iter().all(|c| self[*c].done)
    }
}

impl Index<NodeId> for ItemTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

impl IndexMut<NodeId> for ItemTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

/// Iterator over a parent chain.
pub struct Ancestors<'a> {
    tree: &'a ItemTree,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree[id].parent;
        Some(id)
    }
}

/// Pre-order subtree iterator.
pub struct Walk<'a> {
    tree: &'a ItemTree,
    stack: Vec<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree[id].children.iter().rev().copied());
        Some(id)
    }
}
