//! Project configuration
//!
//! Editing-only state that is discarded on export: the free folder grouping
//! of scenes and assets.

use serde::{Deserialize, Serialize};

use crate::settings::PackageSettings;
use crate::tree::ProjectTree;

/// Current package format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfiguration {
    pub format_version: u32,
    pub project_tree: ProjectTree,
}

impl ProjectConfiguration {
    /// Configuration for a new, empty project
    pub fn new(settings: &PackageSettings) -> Self {
        let mut tree = ProjectTree::new(settings.root_name.clone());
        let root = tree.root();
        for name in &settings.default_folders {
            let folder = tree.new_folder(name.clone());
            // A fresh folder under the root folder always fits
            if let Err(e) = tree.append_child(root, folder) {
                tracing::error!(folder = %name, error = %e, "failed to create default folder");
            }
        }
        Self {
            format_version: FORMAT_VERSION,
            project_tree: tree,
        }
    }
}
