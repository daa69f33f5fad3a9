//! Grouping and dissolving folders

use super::{NodeId, ProjectTree, TreeError};

impl ProjectTree {
    /// Whether the nodes form a non-empty set of siblings (root excluded)
    pub fn are_siblings(&self, nodes: &[NodeId]) -> bool {
        self.common_parent(nodes).is_ok()
    }

    /// Wrap sibling nodes in a new folder.
    ///
    /// The folder takes the position of the first node; the nodes keep
    /// their relative order inside it.
    pub fn group(&mut self, nodes: &[NodeId], name: impl Into<String>) -> Result<NodeId, TreeError> {
        let parent = self.common_parent(nodes)?;

        let mut ordered: Vec<(usize, NodeId)> = Vec::with_capacity(nodes.len());
        for &node in nodes {
            let index = self.index_in_parent(node)?.ok_or(TreeError::NotAttached(node))?;
            if !ordered.iter().any(|&(_, n)| n == node) {
                ordered.push((index, node));
            }
        }
        ordered.sort();
        let first = ordered[0].0;

        for &(index, _) in ordered.iter().rev() {
            self.remove_child(parent, index)?;
        }
        let folder = self.new_folder(name);
        self.insert_child(parent, folder, first)?;
        for &(_, node) in &ordered {
            self.append_child(folder, node)?;
        }
        Ok(folder)
    }

    /// Replace a folder by its children, in place. Returns the children.
    pub fn dissolve(&mut self, folder: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if folder == self.root() {
            return Err(TreeError::RootImmutable);
        }
        if !self.is_branch(folder)? {
            return Err(TreeError::NotAFolder(folder));
        }
        let parent = self.parent(folder)?.ok_or(TreeError::NotAttached(folder))?;
        let index = self.index_in_parent(folder)?.ok_or(TreeError::NotAttached(folder))?;

        let children = self.children(folder)?.to_vec();
        self.remove_child(parent, index)?;
        for (offset, &child) in children.iter().enumerate() {
            self.insert_child(parent, child, index + offset)?;
        }
        self.discard(folder)?;
        Ok(children)
    }

    fn common_parent(&self, nodes: &[NodeId]) -> Result<NodeId, TreeError> {
        let Some(&first) = nodes.first() else {
            return Err(TreeError::EmptySelection);
        };
        let mut parent = None;
        for &node in nodes {
            if node == self.root() {
                return Err(TreeError::RootImmutable);
            }
            let node_parent = self.parent(node)?.ok_or(TreeError::NotAttached(node))?;
            match parent {
                None => parent = Some(node_parent),
                Some(p) if p != node_parent => return Err(TreeError::NotSiblings),
                Some(_) => {}
            }
        }
        parent.ok_or(TreeError::NotAttached(first))
    }
}
