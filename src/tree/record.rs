//! Flat serialized form of the tree
//!
//! The tree persists as its attached nodes in pre-order, each naming its
//! parent by position in the list:
//!
//! ```text
//! [
//!   (name: "Game"),
//!   (name: "Scenes", parent: Some(0)),
//!   (name: "Level 1", value: Some(Scene("6F1C...")), parent: Some(1)),
//!   (name: "Assets", parent: Some(0)),
//! ]
//! ```
//!
//! The first record is the root and the only one without a parent. A parent
//! always precedes its children, and siblings appear in child order, so the
//! record depth stays flat however deep the folders nest. Arena slots and
//! generations are not persisted; loading allocates fresh handles. Detached
//! nodes are dropped.

use std::collections::HashMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::{NodeId, NodeValue, ProjectTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<NodeValue>,
    /// Position of the parent record; `None` only for the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
}

impl ProjectTree {
    /// Snapshot the attached tree as pre-order records
    pub fn to_records(&self) -> Vec<NodeRecord> {
        let mut nodes = vec![self.root];
        nodes.extend(self.descendants(self.root).unwrap_or_default());

        let positions: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        nodes
            .iter()
            .filter_map(|&id| self.node(id).ok())
            .map(|data| NodeRecord {
                name: data.name.clone(),
                value: data.value.clone(),
                parent: data.parent.and_then(|parent| positions.get(&parent).copied()),
            })
            .collect()
    }

    /// Rebuild a tree from pre-order records.
    ///
    /// Persisted trees may nest under items whose kind does not accept
    /// children; the structure is kept as stored.
    pub fn from_records(records: Vec<NodeRecord>) -> Result<ProjectTree, String> {
        let mut records = records.into_iter();
        let Some(root) = records.next() else {
            return Err("project tree has no root".to_string());
        };
        if root.parent.is_some() {
            return Err("first project tree node must be the root".to_string());
        }

        let mut tree = ProjectTree::new(root.name);
        let root_id = tree.root;
        if let Ok(data) = tree.node_mut(root_id) {
            data.value = root.value;
        }

        let mut ids = vec![root_id];
        for (position, record) in records.enumerate().map(|(i, r)| (i + 1, r)) {
            let parent = match record.parent {
                Some(parent) if parent < position => ids[parent],
                Some(parent) => {
                    return Err(format!(
                        "node {} names parent {} that does not precede it",
                        position, parent
                    ))
                }
                None => return Err(format!("node {} has no parent", position)),
            };
            let id = tree.allocate(record.name, record.value);
            tree.node_mut(id).map_err(|e| e.to_string())?.parent = Some(parent);
            tree.node_mut(parent).map_err(|e| e.to_string())?.children.push(id);
            ids.push(id);
        }
        Ok(tree)
    }
}

impl Serialize for ProjectTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_records().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProjectTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<NodeRecord>::deserialize(deserializer)?;
        ProjectTree::from_records(records).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{assert_consistent, sample_tree, scene};
    use super::*;
    use crate::asset::AssetKind;
    use crate::codec;
    use crate::identifier::Identifier;

    #[test]
    fn test_record_round_trip() {
        let (mut tree, folder_a, _, _) = sample_tree();
        let sheet = tree.new_item(
            "Hero",
            NodeValue::Asset {
                kind: AssetKind::SpriteSheet,
                identifier: Identifier::new("A1"),
            },
        );
        tree.insert_child(folder_a, sheet, 0).unwrap();
        // Detached nodes are not persisted
        tree.new_folder("Loose");

        let bytes = codec::encode_record(&tree, false).unwrap();
        let restored: ProjectTree = codec::decode_record(&bytes).unwrap();

        assert_eq!(restored.to_records(), tree.to_records());
        assert_eq!(restored.len(), tree.len() - 1);
        assert_consistent(&restored);

        let restored_a = restored.children(restored.root()).unwrap()[0];
        assert_eq!(restored.name(restored_a).unwrap(), "FolderA");
        assert_eq!(restored.child_count(restored_a).unwrap(), 2);
        assert!(restored.find_value(&scene("S1")).is_some());
    }

    #[test]
    fn test_deep_nesting_round_trip() {
        let mut tree = ProjectTree::new("Game");
        let mut parent = tree.root();
        for depth in 0..200 {
            let folder = tree.new_folder(format!("Level {}", depth));
            tree.append_child(parent, folder).unwrap();
            parent = folder;
        }
        let leaf = tree.new_item("Deepest", scene("S1"));
        tree.append_child(parent, leaf).unwrap();

        for compress in [false, true] {
            let bytes = codec::encode_record(&tree, compress).unwrap();
            let restored: ProjectTree = codec::decode_record(&bytes).unwrap();
            assert_eq!(restored.to_records(), tree.to_records());
            let found = restored.find_value(&scene("S1")).unwrap();
            assert_eq!(restored.ancestors(found).unwrap().len(), 201);
        }
    }

    #[test]
    fn test_folders_omit_value() {
        let tree = ProjectTree::new("Game");
        let text = String::from_utf8(codec::encode_record(&tree, false).unwrap()).unwrap();
        assert!(text.contains("name: \"Game\""));
        assert!(!text.contains("value"));
        assert!(!text.contains("parent"));

        let minimal: ProjectTree = ron::from_str("[(name: \"Only\")]").unwrap();
        assert_eq!(minimal.name(minimal.root()).unwrap(), "Only");
        assert_eq!(minimal.len(), 1);
    }

    #[test]
    fn test_malformed_records_rejected() {
        assert!(ron::from_str::<ProjectTree>("[]").is_err());
        assert!(ron::from_str::<ProjectTree>("[(name: \"A\", parent: Some(0))]").is_err());
        // Parent must come first
        assert!(ron::from_str::<ProjectTree>("[(name: \"A\"), (name: \"B\", parent: Some(1))]").is_err());
        // Only one root
        assert!(ron::from_str::<ProjectTree>("[(name: \"A\"), (name: \"B\")]").is_err());
    }
}
