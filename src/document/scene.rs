//! Scene records
//!
//! The document stores one record per scene, keyed by the scene's
//! identifier (the scene itself does not know it). Scene contents are opaque
//! to the project tree.
//!
//! Entities come in two flavors:
//! - localized: have a parent entity and a place in the scene hierarchy
//! - delocalized: no parent, hold scene-global state

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::{Identifier, IdentifierError, IdentifierProvider};

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("entity not found: {0}")]
    EntityNotFound(Identifier),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    pub identifier: Identifier,
    pub name: String,
    /// Parent entity; `None` for delocalized entities
    #[serde(default)]
    pub parent: Option<Identifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    entities: Vec<SceneEntity>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: Vec::new(),
        }
    }

    pub fn entities(&self) -> &[SceneEntity] {
        &self.entities
    }

    pub fn entity(&self, identifier: &Identifier) -> Option<&SceneEntity> {
        self.entities.iter().find(|e| &e.identifier == identifier)
    }

    /// Entities directly under `parent` (`None` for the top level)
    pub fn children_of<'a>(&'a self, parent: Option<&'a Identifier>) -> impl Iterator<Item = &'a SceneEntity> {
        self.entities.iter().filter(move |e| e.parent.as_ref() == parent)
    }

    /// Create an entity, localized under `parent` or delocalized when `None`
    pub fn create_entity(
        &mut self,
        name: impl Into<String>,
        parent: Option<&Identifier>,
        issuer: &mut IdentifierProvider,
    ) -> Result<Identifier, SceneError> {
        if let Some(parent) = parent {
            if self.entity(parent).is_none() {
                return Err(SceneError::EntityNotFound(parent.clone()));
            }
        }
        let identifier = issuer.new_identifier()?;
        self.entities.push(SceneEntity {
            identifier: identifier.clone(),
            name: name.into(),
            parent: parent.cloned(),
        });
        Ok(identifier)
    }

    /// Remove an entity and everything localized under it
    pub fn remove_entity(&mut self, identifier: &Identifier) -> Result<Vec<SceneEntity>, SceneError> {
        if self.entity(identifier).is_none() {
            return Err(SceneError::EntityNotFound(identifier.clone()));
        }
        let mut doomed = vec![identifier.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i].clone();
            doomed.extend(
                self.entities
                    .iter()
                    .filter(|e| e.parent.as_ref() == Some(&current))
                    .map(|e| e.identifier.clone()),
            );
            i += 1;
        }

        let (removed, kept): (Vec<SceneEntity>, Vec<SceneEntity>) = std::mem::take(&mut self.entities)
            .into_iter()
            .partition(|e| doomed.contains(&e.identifier));
        self.entities = kept;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_entities() {
        let mut issuer = IdentifierProvider::new();
        let mut scene = Scene::new("Level 1");
        let world = scene.create_entity("World", None, &mut issuer).unwrap();
        let player = scene.create_entity("Player", Some(&world), &mut issuer).unwrap();

        assert_eq!(scene.entities().len(), 2);
        assert_eq!(scene.entity(&player).unwrap().parent.as_ref(), Some(&world));
        assert_eq!(scene.children_of(None).count(), 1);
        assert_eq!(scene.children_of(Some(&world)).count(), 1);
        assert!(issuer.contains(&player));
    }

    #[test]
    fn test_unknown_parent() {
        let mut issuer = IdentifierProvider::new();
        let mut scene = Scene::new("Level 1");
        let result = scene.create_entity("Orphan", Some(&Identifier::new("nope")), &mut issuer);
        assert!(matches!(result, Err(SceneError::EntityNotFound(_))));
        assert!(scene.entities().is_empty());
        assert!(issuer.is_empty());
    }

    #[test]
    fn test_remove_entity_subtree() {
        let mut issuer = IdentifierProvider::new();
        let mut scene = Scene::new("Level 1");
        let world = scene.create_entity("World", None, &mut issuer).unwrap();
        let player = scene.create_entity("Player", Some(&world), &mut issuer).unwrap();
        scene.create_entity("Sword", Some(&player), &mut issuer).unwrap();
        let music = scene.create_entity("Music", None, &mut issuer).unwrap();

        let removed = scene.remove_entity(&world).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(scene.entities().len(), 1);
        assert!(scene.entity(&music).is_some());
    }
}
