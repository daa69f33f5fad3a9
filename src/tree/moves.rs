//! Multi-node moves (drag and drop reordering)
//!
//! A move takes a selection of nodes and a drop target `(parent, index)`,
//! where `index` is a position in the parent's child list as it looks before
//! the move. Every check runs before the first mutation, so a rejected move
//! leaves the tree untouched.

use std::collections::HashSet;

use super::{NodeId, ProjectTree, TreeError};

/// One node's relocation, as performed by `move_nodes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMove {
    pub node: NodeId,
    pub src_parent: NodeId,
    pub src_index: usize,
    pub dst_parent: NodeId,
    pub dst_index: usize,
}

impl NodeMove {
    /// The move that puts the node back where it came from.
    ///
    /// Indices are final positions, so the reversed move is replayed with
    /// `ProjectTree::insert_child(dst_parent, node, dst_index)`.
    pub fn reversed(&self) -> NodeMove {
        NodeMove {
            node: self.node,
            src_parent: self.dst_parent,
            src_index: self.dst_index,
            dst_parent: self.src_parent,
            dst_index: self.src_index,
        }
    }
}

impl ProjectTree {
    /// Whether `sources` may be dropped into `parent` (at any valid index)
    pub fn can_move(&self, sources: &[NodeId], parent: NodeId) -> bool {
        self.plan_move(sources, parent).is_ok()
    }

    /// Move `sources` under `parent`, starting at `index`.
    ///
    /// Duplicates are ignored, and a node whose ancestor is also selected
    /// travels with that ancestor. Moved nodes keep their document order.
    /// Returns one [`NodeMove`] per relocated node, in insertion order.
    pub fn move_nodes(&mut self, sources: &[NodeId], parent: NodeId, index: usize) -> Result<Vec<NodeMove>, TreeError> {
        let nodes = self.plan_move(sources, parent)?;
        let len = self.child_count(parent)?;
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }

        let mut origins = Vec::with_capacity(nodes.len());
        for &node in &nodes {
            let src_parent = self.parent(node)?.ok_or(TreeError::NotAttached(node))?;
            let src_index = self.index_in_parent(node)?.ok_or(TreeError::NotAttached(node))?;
            origins.push((node, src_parent, src_index));
        }

        // Siblings above the drop point shift it up by one each once removed
        let shift = origins
            .iter()
            .filter(|(_, src_parent, src_index)| *src_parent == parent && *src_index < index)
            .count();
        let target = index - shift;

        // Remove grouped by parent, highest index first, so pending indices stay valid
        let mut removals = origins.clone();
        removals.sort_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)));
        for &(_, src_parent, src_index) in &removals {
            self.remove_child(src_parent, src_index)?;
        }

        let mut moves = Vec::with_capacity(origins.len());
        for (offset, (node, src_parent, src_index)) in origins.into_iter().enumerate() {
            let dst_index = target + offset;
            self.insert_child(parent, node, dst_index)?;
            moves.push(NodeMove {
                node,
                src_parent,
                src_index,
                dst_parent: parent,
                dst_index,
            });
        }

        tracing::debug!(nodes = moves.len(), parent = %parent, index = target, "moved nodes");
        Ok(moves)
    }

    /// Validate a move and normalize its selection into document order
    fn plan_move(&self, sources: &[NodeId], parent: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::NodeNotFound(parent));
        }

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for &node in sources {
            if !self.contains(node) {
                return Err(TreeError::NodeNotFound(node));
            }
            if node == self.root() {
                return Err(TreeError::RootImmutable);
            }
            if self.parent(node)?.is_none() {
                return Err(TreeError::NotAttached(node));
            }
            if seen.insert(node) {
                unique.push(node);
            }
        }

        for &node in &unique {
            if parent == node || self.is_descendant(parent, node)? {
                return Err(TreeError::CycleDetected);
            }
        }
        if !self.can_accept_children(parent)? {
            return Err(TreeError::CannotAcceptChildren(parent));
        }

        let mut keyed = Vec::with_capacity(unique.len());
        for &node in &unique {
            let covered = self.ancestors(node)?.iter().any(|ancestor| seen.contains(ancestor));
            if !covered {
                keyed.push((self.index_path(node)?, node));
            }
        }
        keyed.sort();
        Ok(keyed.into_iter().map(|(_, node)| node).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{assert_consistent, sample_tree, scene};
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn flat_tree(count: usize) -> (ProjectTree, Vec<NodeId>) {
        let mut tree = ProjectTree::new("Game");
        let nodes: Vec<_> = (0..count)
            .map(|i| {
                let node = tree.new_folder(format!("N{}", i));
                tree.append_child(tree.root(), node).unwrap();
                node
            })
            .collect();
        (tree, nodes)
    }

    #[test]
    fn test_move_between_folders() {
        let (mut tree, folder_a, folder_b, scene1) = sample_tree();
        let moves = tree.move_nodes(&[scene1], folder_b, 0).unwrap();

        assert_eq!(tree.child_count(folder_a).unwrap(), 0);
        assert_eq!(tree.children(folder_b).unwrap(), &[scene1]);
        assert_eq!(tree.index_in_parent(scene1).unwrap(), Some(0));
        assert_eq!(
            moves,
            vec![NodeMove {
                node: scene1,
                src_parent: folder_a,
                src_index: 0,
                dst_parent: folder_b,
                dst_index: 0,
            }]
        );
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_under_own_descendant_fails() {
        let (mut tree, folder_a, _, scene1) = sample_tree();
        let before = tree.descendants(tree.root()).unwrap();

        assert_eq!(tree.move_nodes(&[folder_a], scene1, 0), Err(TreeError::CycleDetected));
        assert_eq!(tree.move_nodes(&[folder_a], folder_a, 0), Err(TreeError::CycleDetected));
        assert!(!tree.can_move(&[folder_a], scene1));
        assert_eq!(tree.descendants(tree.root()).unwrap(), before);
    }

    #[test]
    fn test_drop_onto_item_rejected() {
        let (mut tree, _, folder_b, scene1) = sample_tree();
        assert_eq!(
            tree.move_nodes(&[folder_b], scene1, 0),
            Err(TreeError::CannotAcceptChildren(scene1))
        );
        assert_eq!(tree.move_nodes(&[tree.root()], folder_b, 0), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_move_later_in_same_parent() {
        let (mut tree, n) = flat_tree(5);
        // Drop N0 and N1 between N3 and N4
        tree.move_nodes(&[n[0], n[1]], tree.root(), 4).unwrap();
        assert_eq!(tree.children(tree.root()).unwrap(), &[n[2], n[3], n[0], n[1], n[4]]);
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_earlier_in_same_parent() {
        let (mut tree, n) = flat_tree(5);
        tree.move_nodes(&[n[4], n[2]], tree.root(), 1).unwrap();
        // Document order is kept regardless of selection order
        assert_eq!(tree.children(tree.root()).unwrap(), &[n[0], n[2], n[4], n[1], n[3]]);
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_to_end() {
        let (mut tree, n) = flat_tree(3);
        tree.move_nodes(&[n[0]], tree.root(), 3).unwrap();
        assert_eq!(tree.children(tree.root()).unwrap(), &[n[1], n[2], n[0]]);
        assert_eq!(
            tree.move_nodes(&[n[0]], tree.root(), 4),
            Err(TreeError::IndexOutOfRange { index: 4, len: 3 })
        );
    }

    #[test]
    fn test_selected_descendant_travels_with_ancestor() {
        let (mut tree, folder_a, folder_b, scene1) = sample_tree();
        let moves = tree.move_nodes(&[scene1, folder_a, scene1], folder_b, 0).unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(tree.children(folder_b).unwrap(), &[folder_a]);
        assert_eq!(tree.children(folder_a).unwrap(), &[scene1]);
        assert_consistent(&tree);
    }

    #[test]
    fn test_move_from_several_parents() {
        let (mut tree, folder_a, folder_b, scene1) = sample_tree();
        let scene2 = tree.new_item("Scene2", scene("S2"));
        tree.append_child(folder_b, scene2).unwrap();

        tree.move_nodes(&[scene2, scene1], tree.root(), 0).unwrap();
        assert_eq!(tree.children(tree.root()).unwrap(), &[scene1, scene2, folder_a, folder_b]);
        assert_consistent(&tree);
    }

    #[test]
    fn test_reversed_move_restores() {
        let (mut tree, n) = flat_tree(4);
        for (node, drop_at) in [(n[1], 4), (n[3], 0)] {
            let moves = tree.move_nodes(&[node], tree.root(), drop_at).unwrap();
            let back = moves[0].reversed();
            tree.insert_child(back.dst_parent, back.node, back.dst_index).unwrap();
            assert_eq!(tree.children(tree.root()).unwrap(), n.as_slice());
        }
    }

    #[test]
    fn test_noop_move_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut tree, n) = flat_tree(6);
        for _ in 0..50 {
            let node = *n.choose(&mut rng).unwrap();
            let index = tree.index_in_parent(node).unwrap().unwrap();
            let before = tree.children(tree.root()).unwrap().to_vec();
            // Both "before itself" and "after itself" are the current position
            let drop_at = index + rng.gen_range(0..=1);
            tree.move_nodes(&[node], tree.root(), drop_at).unwrap();
            assert_eq!(tree.children(tree.root()).unwrap(), before.as_slice());
        }
    }

    #[test]
    fn test_random_moves_keep_invariants() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut tree = ProjectTree::new("Game");
        let mut nodes = Vec::new();
        for i in 0..20 {
            let node = if i % 4 == 0 {
                tree.new_item(format!("Item{}", i), scene(&format!("S{}", i)))
            } else {
                tree.new_folder(format!("Folder{}", i))
            };
            tree.append_child(tree.root(), node).unwrap();
            nodes.push(node);
        }

        for _ in 0..500 {
            let count = rng.gen_range(1..=3);
            let sources: Vec<_> = nodes.choose_multiple(&mut rng, count).copied().collect();
            let mut targets = nodes.clone();
            targets.push(tree.root());
            let parent = *targets.choose(&mut rng).unwrap();
            let index = rng.gen_range(0..=tree.child_count(parent).unwrap());

            let before = tree.descendants(tree.root()).unwrap();
            match tree.move_nodes(&sources, parent, index) {
                Ok(_) => {
                    for &source in &sources {
                        assert!(tree.is_attached(source));
                    }
                }
                Err(_) => assert_eq!(tree.descendants(tree.root()).unwrap(), before),
            }
            assert_eq!(tree.descendants(tree.root()).unwrap().len(), nodes.len());
            assert_consistent(&tree);
        }
    }
}
