//! Referential integrity
//!
//! Loading only checks that every record decodes. References between
//! subsystems (tree payloads, resource references, composite dependencies)
//! are checked on demand by [`Document::check_integrity`].

use std::fmt;

use super::Document;
use crate::asset::AssetKind;
use crate::identifier::Identifier;
use crate::tree::{NodeId, NodeValue};

/// A reference that does not resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// A tree node points at a scene the document does not have
    MissingScene { node: NodeId, scene: Identifier },
    /// A tree node points at an asset the library does not have
    MissingAsset {
        node: NodeId,
        kind: AssetKind,
        asset: Identifier,
    },
    /// An asset references a resource the cache does not have
    MissingResource { asset: Identifier, resource: Identifier },
    /// A composite asset depends on an asset the library does not have
    MissingDependency { asset: Identifier, dependency: Identifier },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::MissingScene { node, scene } => {
                write!(f, "node {} references missing scene {}", node, scene)
            }
            IntegrityIssue::MissingAsset { node, kind, asset } => {
                write!(f, "node {} references missing {} asset {}", node, kind.name(), asset)
            }
            IntegrityIssue::MissingResource { asset, resource } => {
                write!(f, "asset {} references missing resource {}", asset, resource)
            }
            IntegrityIssue::MissingDependency { asset, dependency } => {
                write!(f, "asset {} depends on missing asset {}", asset, dependency)
            }
        }
    }
}

impl Document {
    /// Report every dangling reference in the document
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for (node, value) in self.tree().nodes_with_values() {
            match value {
                NodeValue::Scene(scene) => {
                    if !self.scenes.contains_key(scene) {
                        issues.push(IntegrityIssue::MissingScene {
                            node,
                            scene: scene.clone(),
                        });
                    }
                }
                NodeValue::Asset { kind, identifier } => {
                    if !self.library.contains(*kind, identifier) {
                        issues.push(IntegrityIssue::MissingAsset {
                            node,
                            kind: *kind,
                            asset: identifier.clone(),
                        });
                    }
                }
            }
        }

        for asset in self.library.iter() {
            if let Some(resource) = asset.binary_resource_identifier() {
                if !self.resources.contains(resource) {
                    issues.push(IntegrityIssue::MissingResource {
                        asset: asset.identifier().clone(),
                        resource: resource.clone(),
                    });
                }
            }
            for dependency in asset.dependencies() {
                if self.library.get_any(dependency).is_none() {
                    issues.push(IntegrityIssue::MissingDependency {
                        asset: asset.identifier().clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "document has dangling references");
        }
        issues
    }
}
