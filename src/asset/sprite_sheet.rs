//! Sprite sheets
//!
//! In the editor a sprite sheet is just a named collection of image assets
//! sharing one scale factor. No texture packing happens here; atlases are
//! built at export time from the referenced images.

use serde::{Deserialize, Serialize};

use super::{Asset, AssetKind, CompositeAsset, CompositeAssetOptions, CompositeImageAsset, CompositeImageAssetOptions};
use crate::identifier::{Identifier, IdentifierError, IdentifierProvider};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSheetAsset {
    pub name: String,
    identifier: Identifier,
    /// Points per source pixel, shared by every image in the sheet
    scale_factor: f32,
    /// Image asset identifiers, in import order
    pub dependencies: Vec<Identifier>,
}

/// Creation options entered by the user on import
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheetOptions {
    pub name: String,
    pub scale_factor: f32,
}

impl Default for SpriteSheetOptions {
    fn default() -> Self {
        Self {
            name: "Sprite Sheet".to_string(),
            scale_factor: 1.0,
        }
    }
}

impl CompositeAssetOptions for SpriteSheetOptions {
    fn name(&self) -> &str {
        &self.name
    }
}

impl CompositeImageAssetOptions for SpriteSheetOptions {
    fn new(name: String, scale_factor: f32) -> Self {
        Self { name, scale_factor }
    }

    fn scale_factor(&self) -> f32 {
        self.scale_factor
    }
}

impl Asset for SpriteSheetAsset {
    const KIND: AssetKind = AssetKind::SpriteSheet;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    super::any_asset_conversions!(SpriteSheet);
}

impl CompositeAsset for SpriteSheetAsset {
    type Options = SpriteSheetOptions;

    fn dependencies(&self) -> &[Identifier] {
        &self.dependencies
    }

    fn dependencies_mut(&mut self) -> &mut Vec<Identifier> {
        &mut self.dependencies
    }

    fn new_composite(
        dependencies: Vec<Identifier>,
        issuer: &mut IdentifierProvider,
        options: SpriteSheetOptions,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            name: options.name,
            identifier: issuer.new_identifier()?,
            scale_factor: options.scale_factor,
            dependencies,
        })
    }
}

impl CompositeImageAsset for SpriteSheetAsset {
    fn scale_factor(&self) -> f32 {
        self.scale_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_composite() {
        let mut issuer = IdentifierProvider::new();
        let deps = vec![Identifier::new("a"), Identifier::new("b")];
        let options = <SpriteSheetOptions as CompositeImageAssetOptions>::new("Hero".to_string(), 2.0);
        let mut sheet = SpriteSheetAsset::new_composite(deps.clone(), &mut issuer, options).unwrap();

        assert_eq!(sheet.name(), "Hero");
        assert_eq!(sheet.scale_factor(), 2.0);
        assert_eq!(sheet.dependencies(), deps.as_slice());
        assert!(issuer.contains(sheet.identifier()));

        sheet.dependencies_mut().retain(|id| id.as_str() != "a");
        assert_eq!(sheet.dependencies(), &[Identifier::new("b")]);
    }
}
