//! Project tree
//!
//! The ordered folder hierarchy the editor shows in its project navigator.
//! Folders group items freely; leaf items carry a [`NodeValue`] pointing at
//! a scene or a library asset.
//!
//! All nodes live in an arena owned by [`ProjectTree`]. A parent owns its
//! ordered child list; the child's parent link is a plain [`NodeId`] used for
//! upward traversal only. Every mutation keeps both sides in sync:
//! - the tree is acyclic
//! - a node is listed by at most one parent, and its parent link names it
//! - the root is never removed, deleted or reparented
//!
//! Nodes can exist detached (created but not yet inserted, or removed with
//! [`ProjectTree::remove_child`]); detached nodes are not persisted.

mod editing;
mod moves;
mod node;
mod record;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetKind;
use crate::identifier::Identifier;

pub use moves::NodeMove;
pub use node::NodeId;
pub use record::NodeRecord;

use node::NodeAllocator;

/// Structural errors; the edit that raised one must be abandoned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("operation would make a node its own ancestor")]
    CycleDetected,

    #[error("the root node cannot be removed, deleted or moved")]
    RootImmutable,

    #[error("node {0} cannot have children")]
    CannotAcceptChildren(NodeId),

    #[error("node {0} is not attached to a parent")]
    NotAttached(NodeId),

    #[error("node {0} is still attached to the tree")]
    StillAttached(NodeId),

    #[error("node {0} is not a folder")]
    NotAFolder(NodeId),

    #[error("nodes do not share a parent")]
    NotSiblings,

    #[error("no nodes given")]
    EmptySelection,
}

/// Payload of a leaf node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeValue {
    /// A scene of the document, by identifier
    Scene(Identifier),
    /// A library asset, by kind and identifier
    Asset { kind: AssetKind, identifier: Identifier },
}

impl NodeValue {
    pub fn identifier(&self) -> &Identifier {
        match self {
            NodeValue::Scene(identifier) => identifier,
            NodeValue::Asset { identifier, .. } => identifier,
        }
    }

    /// Whether nodes carrying this value may have children.
    ///
    /// Scene entities are edited inside the scene, so no payload kind nests.
    pub fn accepts_children(&self) -> bool {
        match self {
            NodeValue::Scene(_) => false,
            NodeValue::Asset { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    value: Option<NodeValue>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed ordered tree
#[derive(Debug, Clone)]
pub struct ProjectTree {
    allocator: NodeAllocator,
    slots: Vec<Option<NodeData>>,
    root: NodeId,
}

impl ProjectTree {
    /// Create a tree holding only a root folder
    pub fn new(root_name: impl Into<String>) -> Self {
        let mut tree = Self {
            allocator: NodeAllocator::new(),
            slots: Vec::new(),
            root: NodeId::new(0, 0),
        };
        tree.root = tree.allocate(root_name.into(), None);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the handle names a live node (attached or not)
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Number of live nodes, detached ones included
    pub fn len(&self) -> usize {
        self.allocator.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self, id: NodeId) -> Result<&str, TreeError> {
        Ok(&self.node(id)?.name)
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), TreeError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn value(&self, id: NodeId) -> Result<Option<&NodeValue>, TreeError> {
        Ok(self.node(id)?.value.as_ref())
    }

    /// True for pure grouping folders (no payload)
    pub fn is_branch(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self.node(id)?.value.is_none())
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(&self.node(id)?.children)
    }

    pub fn child_count(&self, id: NodeId) -> Result<usize, TreeError> {
        Ok(self.node(id)?.children.len())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        Ok(self.node(id)?.parent)
    }

    /// Position within the parent's child list; `None` for the root and detached nodes
    pub fn index_in_parent(&self, id: NodeId) -> Result<Option<usize>, TreeError> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(None);
        };
        Ok(self.node(parent)?.children.iter().position(|&child| child == id))
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> Result<bool, TreeError> {
        self.node(ancestor)?;
        let mut current = self.node(id)?.parent;
        while let Some(node) = current {
            if node == ancestor {
                return Ok(true);
            }
            current = self.node(node)?.parent;
        }
        Ok(false)
    }

    /// Parent chain, nearest first
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent;
        while let Some(node) = current {
            chain.push(node);
            current = self.node(node)?.parent;
        }
        Ok(chain)
    }

    /// All nodes below `id` in pre-order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.node(node)?.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Whether the node is the root or hangs below it
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        self.is_descendant(id, self.root).unwrap_or(false)
    }

    /// Folders always accept children; items only if their payload kind does
    pub fn can_accept_children(&self, id: NodeId) -> Result<bool, TreeError> {
        Ok(self
            .node(id)?
            .value
            .as_ref()
            .map(NodeValue::accepts_children)
            .unwrap_or(true))
    }

    /// First attached node carrying `value`, in pre-order
    pub fn find_value(&self, value: &NodeValue) -> Option<NodeId> {
        self.nodes_with_values()
            .into_iter()
            .find(|(_, v)| *v == value)
            .map(|(id, _)| id)
    }

    /// Every attached leaf with its payload, in pre-order
    pub fn nodes_with_values(&self) -> Vec<(NodeId, &NodeValue)> {
        let nodes = self.descendants(self.root).unwrap_or_default();
        nodes
            .into_iter()
            .filter_map(|id| {
                self.node(id)
                    .ok()
                    .and_then(|data| data.value.as_ref())
                    .map(|value| (id, value))
            })
            .collect()
    }

    /// Create a detached folder
    pub fn new_folder(&mut self, name: impl Into<String>) -> NodeId {
        self.allocate(name.into(), None)
    }

    /// Create a detached leaf item
    pub fn new_item(&mut self, name: impl Into<String>, value: NodeValue) -> NodeId {
        self.allocate(name.into(), Some(value))
    }

    /// Insert `child` into `parent`'s child list at `index`.
    ///
    /// A child that already has a parent is detached from it first; `index`
    /// refers to the list after that detachment and must be in
    /// `0..=child_count`. Nothing changes if any check fails.
    pub fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;

        let old_parent = self.node(child)?.parent;
        let len = self.node(parent)?.children.len() - usize::from(old_parent == Some(parent));
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }

        self.detach(child)?;
        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        let len = self.node(parent)?.children.len();
        let index = if self.node(child)?.parent == Some(parent) { len - 1 } else { len };
        self.insert_child(parent, child, index)
    }

    /// Remove and return the child at `index`; it stays alive, detached
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let children = &mut self.node_mut(parent)?.children;
        if index >= children.len() {
            return Err(TreeError::IndexOutOfRange {
                index,
                len: children.len(),
            });
        }
        let child = children.remove(index);
        self.node_mut(child)?.parent = None;
        Ok(child)
    }

    /// Detach a node (if attached) and free its whole subtree.
    ///
    /// Returns the payloads of the freed nodes in pre-order so the caller
    /// can drop whatever they referenced.
    pub fn delete(&mut self, id: NodeId) -> Result<Vec<NodeValue>, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        self.node(id)?;
        self.detach(id)?;
        self.free_subtree(id)
    }

    /// Free a detached subtree, e.g. one built but never inserted
    pub fn discard(&mut self, id: NodeId) -> Result<Vec<NodeValue>, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        if self.node(id)?.parent.is_some() {
            return Err(TreeError::StillAttached(id));
        }
        self.free_subtree(id)
    }

    /// Index path from the topmost ancestor down to `id`; orders nodes in document order
    pub(crate) fn index_path(&self, id: NodeId) -> Result<Vec<usize>, TreeError> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current)?.parent {
            let index = self
                .node(parent)?
                .children
                .iter()
                .position(|&child| child == current)
                .ok_or(TreeError::NodeNotFound(current))?;
            path.push(index);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(TreeError::RootImmutable);
        }
        if parent == child || self.is_descendant(parent, child)? {
            return Err(TreeError::CycleDetected);
        }
        if !self.can_accept_children(parent)? {
            return Err(TreeError::CannotAcceptChildren(parent));
        }
        Ok(())
    }

    /// Unlink a node from its parent's child list (no-op when detached)
    fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|&child| child != id);
        }
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) -> Result<Vec<NodeValue>, TreeError> {
        let mut nodes = vec![id];
        nodes.extend(self.descendants(id)?);

        let mut values = Vec::new();
        for node in nodes {
            if let Some(data) = self.slots.get_mut(node.index() as usize).and_then(Option::take) {
                values.extend(data.value);
            }
            self.allocator.free(node);
        }
        Ok(values)
    }

    fn allocate(&mut self, name: String, value: Option<NodeValue>) -> NodeId {
        let id = self.allocator.allocate();
        let data = NodeData {
            name,
            value,
            parent: None,
            children: Vec::new(),
        };
        let index = id.index() as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(data);
        id
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, TreeError> {
        if !self.allocator.is_alive(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .ok_or(TreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, TreeError> {
        if !self.allocator.is_alive(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(TreeError::NodeNotFound(id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    pub(crate) fn scene(name: &str) -> NodeValue {
        NodeValue::Scene(Identifier::new(name))
    }

    /// Every live node is listed by exactly its parent, and index_in_parent agrees
    pub(crate) fn assert_consistent(tree: &ProjectTree) {
        for (slot, data) in tree.slots.iter().enumerate() {
            let Some(data) = data else { continue };
            for (i, &child) in data.children.iter().enumerate() {
                let child_data = tree.node(child).unwrap();
                let parent = child_data.parent.unwrap();
                assert_eq!(parent.index() as usize, slot);
                assert_eq!(tree.index_in_parent(child).unwrap(), Some(i));
            }
            if let Some(parent) = data.parent {
                let claims = tree
                    .slots
                    .iter()
                    .flatten()
                    .filter(|d| d.children.iter().any(|&c| c.index() as usize == slot))
                    .count();
                assert_eq!(claims, 1);
                assert!(tree.contains(parent));
            }
        }
        assert!(tree.parent(tree.root()).unwrap().is_none());
    }

    /// Root → [FolderA → [Scene1], FolderB]
    pub(crate) fn sample_tree() -> (ProjectTree, NodeId, NodeId, NodeId) {
        let mut tree = ProjectTree::new("Game");
        let folder_a = tree.new_folder("FolderA");
        let folder_b = tree.new_folder("FolderB");
        let scene1 = tree.new_item("Scene1", scene("S1"));
        tree.append_child(tree.root(), folder_a).unwrap();
        tree.append_child(tree.root(), folder_b).unwrap();
        tree.append_child(folder_a, scene1).unwrap();
        (tree, folder_a, folder_b, scene1)
    }

    #[test]
    fn test_build_and_query() {
        let (tree, folder_a, folder_b, scene1) = sample_tree();
        let root = tree.root();

        assert_eq!(tree.children(root).unwrap(), &[folder_a, folder_b]);
        assert_eq!(tree.parent(scene1).unwrap(), Some(folder_a));
        assert_eq!(tree.index_in_parent(folder_b).unwrap(), Some(1));
        assert_eq!(tree.index_in_parent(root).unwrap(), None);
        assert!(tree.is_descendant(scene1, root).unwrap());
        assert!(!tree.is_descendant(root, scene1).unwrap());
        assert!(!tree.is_descendant(scene1, scene1).unwrap());
        assert_eq!(tree.ancestors(scene1).unwrap(), vec![folder_a, root]);
        assert_eq!(tree.descendants(root).unwrap(), vec![folder_a, scene1, folder_b]);
        assert!(tree.is_branch(folder_a).unwrap());
        assert!(!tree.is_branch(scene1).unwrap());
        assert_eq!(tree.find_value(&scene("S1")), Some(scene1));
        assert_eq!(tree.nodes_with_values().len(), 1);
        assert_consistent(&tree);
    }

    #[test]
    fn test_insert_under_own_descendant_fails() {
        let (mut tree, folder_a, _, scene1) = sample_tree();
        let sub = tree.new_folder("Sub");
        tree.append_child(folder_a, sub).unwrap();

        assert_eq!(tree.insert_child(sub, folder_a, 0), Err(TreeError::CycleDetected));
        assert_eq!(tree.insert_child(folder_a, folder_a, 0), Err(TreeError::CycleDetected));
        assert_eq!(tree.children(folder_a).unwrap(), &[scene1, sub]);
        assert_consistent(&tree);
    }

    #[test]
    fn test_insert_validates_index_and_target() {
        let (mut tree, folder_a, folder_b, scene1) = sample_tree();
        let extra = tree.new_folder("Extra");

        assert_eq!(
            tree.insert_child(folder_b, extra, 1),
            Err(TreeError::IndexOutOfRange { index: 1, len: 0 })
        );
        assert_eq!(tree.insert_child(scene1, extra, 0), Err(TreeError::CannotAcceptChildren(scene1)));
        assert_eq!(tree.insert_child(folder_a, tree.root(), 0), Err(TreeError::RootImmutable));
        assert_eq!(tree.parent(extra).unwrap(), None);
    }

    #[test]
    fn test_insert_reparents() {
        let (mut tree, folder_a, folder_b, scene1) = sample_tree();
        tree.insert_child(folder_b, scene1, 0).unwrap();
        assert!(tree.children(folder_a).unwrap().is_empty());
        assert_eq!(tree.children(folder_b).unwrap(), &[scene1]);
        assert_eq!(tree.parent(scene1).unwrap(), Some(folder_b));
        assert_consistent(&tree);
    }

    #[test]
    fn test_remove_child() {
        let (mut tree, folder_a, _, scene1) = sample_tree();
        assert_eq!(
            tree.remove_child(folder_a, 1),
            Err(TreeError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(tree.remove_child(folder_a, 0).unwrap(), scene1);
        assert_eq!(tree.parent(scene1).unwrap(), None);
        assert!(tree.contains(scene1));
        assert!(!tree.is_attached(scene1));
        assert!(tree.find_value(&scene("S1")).is_none());
        assert_consistent(&tree);
    }

    #[test]
    fn test_delete_frees_subtree() {
        let (mut tree, folder_a, _, scene1) = sample_tree();
        let before = tree.len();
        let values = tree.delete(folder_a).unwrap();

        assert_eq!(values, vec![scene("S1")]);
        assert_eq!(tree.len(), before - 2);
        assert!(!tree.contains(folder_a));
        assert_eq!(tree.name(scene1), Err(TreeError::NodeNotFound(scene1)));
        assert_eq!(tree.delete(tree.root()), Err(TreeError::RootImmutable));

        // The freed slot is reused under a new generation
        let fresh = tree.new_folder("Fresh");
        assert_eq!(fresh.index(), scene1.index());
        assert!(tree.contains(fresh));
        assert!(!tree.contains(scene1));
        assert_consistent(&tree);
    }

    #[test]
    fn test_discard_requires_detached() {
        let (mut tree, folder_a, _, _) = sample_tree();
        assert_eq!(tree.discard(folder_a), Err(TreeError::StillAttached(folder_a)));

        let loose = tree.new_item("Loose", scene("L"));
        assert_eq!(tree.discard(loose).unwrap(), vec![scene("L")]);
        assert!(!tree.contains(loose));
    }

    #[test]
    fn test_random_edits_stay_acyclic() {
        let mut rng = StdRng::seed_from_u64(0xB0B);
        let mut tree = ProjectTree::new("Game");
        let mut nodes = vec![tree.root()];
        for i in 0..40 {
            let node = if i % 3 == 0 {
                tree.new_item(format!("Item{}", i), scene(&format!("S{}", i)))
            } else {
                tree.new_folder(format!("Folder{}", i))
            };
            nodes.push(node);
        }

        for _ in 0..2_000 {
            let parent = nodes[rng.gen_range(0..nodes.len())];
            let child = nodes[rng.gen_range(0..nodes.len())];
            if rng.gen_bool(0.2) {
                let len = tree.child_count(parent).unwrap();
                if len > 0 {
                    tree.remove_child(parent, rng.gen_range(0..len)).unwrap();
                }
                continue;
            }

            let len = tree.child_count(parent).unwrap();
            let index = rng.gen_range(0..=len);
            let descendant_parent = tree.is_descendant(parent, child).unwrap();
            let snapshot = tree.descendants(tree.root()).unwrap();
            match tree.insert_child(parent, child, index) {
                Ok(()) => assert!(!descendant_parent && parent != child),
                Err(TreeError::CycleDetected) => {
                    assert!(descendant_parent || parent == child);
                    assert_eq!(tree.descendants(tree.root()).unwrap(), snapshot);
                }
                Err(_) => assert_eq!(tree.descendants(tree.root()).unwrap(), snapshot),
            }

            for &node in &nodes {
                assert!(!tree.is_descendant(node, node).unwrap());
            }
            assert_consistent(&tree);
        }
    }
}
