//! Editing commands
//!
//! Tree edits that also keep the scenes and the asset library in step. Each
//! command validates its whole input before mutating anything.

use std::collections::HashSet;

use super::{Document, DocumentError, Scene};
use crate::asset::{AssetImporter, AssetKind, ImageSource, ImportReport, SpriteSheetAsset, SpriteSheetOptions};
use crate::identifier::Identifier;
use crate::tree::{NodeId, NodeMove, NodeValue, TreeError};

/// Commands offered for a tree selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditAction {
    Delete,
    AddScene,
    AddAsset,
    Group,
    Dissolve,
}

impl Document {
    /// Create an empty folder under `parent` at `index`
    pub fn new_folder(&mut self, parent: NodeId, index: usize, name: impl Into<String>) -> Result<NodeId, DocumentError> {
        let tree = self.tree_mut();
        let folder = tree.new_folder(name);
        if let Err(e) = tree.insert_child(parent, folder, index) {
            tree.discard(folder)?;
            return Err(e.into());
        }
        Ok(folder)
    }

    /// Create a scene and its tree node.
    ///
    /// With a folder selected the scene becomes its last child; with an item
    /// selected it is placed right after that item.
    pub fn new_scene(&mut self, relative_to: NodeId, name: impl Into<String>) -> Result<(NodeId, Identifier), DocumentError> {
        let name = name.into();
        let (parent, index) = self.placement_near(relative_to)?;
        let identifier = self.new_identifier()?;
        let node = self.place_item(parent, index, name.clone(), NodeValue::Scene(identifier.clone()))?;
        self.scenes.insert(identifier.clone(), Scene::new(name));
        tracing::debug!(scene = %identifier, node = %node, "created scene");
        Ok((node, identifier))
    }

    /// Add a tree node for an asset already in the library
    pub fn add_asset_node(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: AssetKind,
        identifier: &Identifier,
    ) -> Result<NodeId, DocumentError> {
        let name = match self.library.get_any(identifier) {
            Some(asset) if asset.kind() == kind => asset.name().to_string(),
            _ => {
                return Err(DocumentError::AssetNotFound {
                    kind,
                    identifier: identifier.clone(),
                })
            }
        };
        let value = NodeValue::Asset {
            kind,
            identifier: identifier.clone(),
        };
        self.place_item(parent, index, name, value)
    }

    /// Import images as a sprite sheet and add its node under `parent`.
    ///
    /// Returns `Ok(None)` when none of the sources is an image.
    pub fn import_sprite_sheet(
        &mut self,
        parent: NodeId,
        index: usize,
        sources: Vec<ImageSource>,
        options: SpriteSheetOptions,
    ) -> Result<Option<(NodeId, ImportReport)>, DocumentError> {
        self.check_placement(parent, index)?;

        let name = options.name.clone();
        let report = {
            let mut importer = AssetImporter::new(&mut self.resources, &mut self.library);
            importer.import_composite::<SpriteSheetAsset>(sources, options)?
        };
        let Some(report) = report else {
            return Ok(None);
        };

        let value = NodeValue::Asset {
            kind: AssetKind::SpriteSheet,
            identifier: report.composite.clone(),
        };
        let node = self.place_item(parent, index, name, value)?;
        tracing::info!(
            sheet = %report.composite,
            images = report.images.len(),
            skipped = report.skipped.len(),
            "imported sprite sheet"
        );
        Ok(Some((node, report)))
    }

    /// Wrap sibling nodes in a new folder
    pub fn group(&mut self, nodes: &[NodeId], name: impl Into<String>) -> Result<NodeId, DocumentError> {
        Ok(self.tree_mut().group(nodes, name)?)
    }

    /// Replace each folder by its children
    pub fn dissolve(&mut self, folders: &[NodeId]) -> Result<Vec<NodeId>, DocumentError> {
        let folders = self.check_dissolve(folders)?;
        let mut released = Vec::new();
        for folder in folders {
            released.extend(self.tree_mut().dissolve(folder)?);
        }
        Ok(released)
    }

    /// Delete nodes with their subtrees.
    ///
    /// Scenes and assets no longer referenced by any node are dropped from
    /// the document. Binary resources stay cached.
    pub fn delete_items(&mut self, nodes: &[NodeId]) -> Result<(), DocumentError> {
        if nodes.is_empty() {
            return Err(TreeError::EmptySelection.into());
        }
        for &node in nodes {
            if node == self.tree().root() {
                return Err(TreeError::RootImmutable.into());
            }
            if !self.tree().contains(node) {
                return Err(TreeError::NodeNotFound(node).into());
            }
        }

        let mut freed = Vec::new();
        for &node in nodes {
            // Already gone with a selected ancestor
            if self.tree().contains(node) {
                freed.extend(self.tree_mut().delete(node)?);
            }
        }

        for value in freed {
            if self.tree().find_value(&value).is_some() {
                continue;
            }
            match value {
                NodeValue::Scene(identifier) => {
                    self.scenes.remove(&identifier);
                    tracing::debug!(scene = %identifier, "dropped scene");
                }
                NodeValue::Asset { kind, identifier } => {
                    self.library.remove_any(kind, &identifier);
                    tracing::debug!(asset = %identifier, kind = %kind, "dropped asset");
                }
            }
        }
        Ok(())
    }

    /// Rename a node and the scene or asset it stands for
    pub fn rename(&mut self, node: NodeId, name: impl Into<String>) -> Result<(), DocumentError> {
        let name = name.into();
        let value = self.tree().value(node)?.cloned();
        self.tree_mut().set_name(node, name.clone())?;
        match value {
            Some(NodeValue::Scene(identifier)) => {
                if let Some(scene) = self.scenes.get_mut(&identifier) {
                    scene.name = name;
                }
            }
            Some(NodeValue::Asset { kind, identifier }) => {
                if let Some(asset) = self.library.get_any_mut(&identifier) {
                    if asset.kind() == kind {
                        asset.set_name(name);
                    }
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Drag and drop: move the selection under `parent` at `index`
    pub fn move_items(&mut self, nodes: &[NodeId], parent: NodeId, index: usize) -> Result<Vec<NodeMove>, DocumentError> {
        Ok(self.tree_mut().move_nodes(nodes, parent, index)?)
    }

    /// Commands that apply to the given selection
    pub fn available_actions(&self, selection: &[NodeId]) -> Vec<EditAction> {
        let tree = self.tree();
        if selection.is_empty() || selection.iter().any(|&node| !tree.contains(node)) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if !selection.contains(&tree.root()) {
            actions.push(EditAction::Delete);
        }
        if selection.len() == 1 && self.placement_near(selection[0]).is_ok() {
            actions.push(EditAction::AddScene);
            actions.push(EditAction::AddAsset);
        }
        if tree.are_siblings(selection) {
            actions.push(EditAction::Group);
        }
        if self.check_dissolve(selection).is_ok() {
            actions.push(EditAction::Dissolve);
        }
        actions
    }

    /// Where a new item goes when `node` is selected
    fn placement_near(&self, node: NodeId) -> Result<(NodeId, usize), TreeError> {
        let tree = self.tree();
        if tree.can_accept_children(node)? {
            return Ok((node, tree.child_count(node)?));
        }
        let parent = tree.parent(node)?.ok_or(TreeError::NotAttached(node))?;
        let index = tree.index_in_parent(node)?.ok_or(TreeError::NotAttached(node))?;
        Ok((parent, index + 1))
    }

    fn check_placement(&self, parent: NodeId, index: usize) -> Result<(), TreeError> {
        let tree = self.tree();
        if !tree.can_accept_children(parent)? {
            return Err(TreeError::CannotAcceptChildren(parent));
        }
        let len = tree.child_count(parent)?;
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    fn place_item(&mut self, parent: NodeId, index: usize, name: String, value: NodeValue) -> Result<NodeId, DocumentError> {
        self.check_placement(parent, index)?;
        let tree = self.tree_mut();
        let node = tree.new_item(name, value);
        if let Err(e) = tree.insert_child(parent, node, index) {
            tree.discard(node)?;
            return Err(e.into());
        }
        Ok(node)
    }

    /// Validate a dissolve selection; returns it without duplicates
    fn check_dissolve(&self, folders: &[NodeId]) -> Result<Vec<NodeId>, TreeError> {
        let tree = self.tree();
        if folders.is_empty() {
            return Err(TreeError::EmptySelection);
        }
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(folders.len());
        for &folder in folders {
            if folder == tree.root() {
                return Err(TreeError::RootImmutable);
            }
            if !tree.is_branch(folder)? {
                return Err(TreeError::NotAFolder(folder));
            }
            if !tree.is_attached(folder) {
                return Err(TreeError::NotAttached(folder));
            }
            if seen.insert(folder) {
                unique.push(folder);
            }
        }
        for &folder in &unique {
            for &other in &unique {
                if folder != other && tree.is_descendant(folder, other)? {
                    return Err(TreeError::CycleDetected);
                }
            }
        }
        Ok(unique)
    }
}
