use serde::{Deserialize, Serialize};

use super::{Asset, AssetKind, BinaryResourceAsset};
use crate::identifier::{Identifier, IdentifierError, IdentifierProvider};

/// One image in the library, backed by a cached binary resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// User-facing name (not unique)
    pub name: String,
    identifier: Identifier,
    binary_resource_identifier: Identifier,
}

impl ImageAsset {
    /// Create an image asset for an already cached resource
    pub fn new(
        name: impl Into<String>,
        resource_identifier: Identifier,
        issuer: &mut IdentifierProvider,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            name: name.into(),
            identifier: issuer.new_identifier()?,
            binary_resource_identifier: resource_identifier,
        })
    }
}

impl Asset for ImageAsset {
    const KIND: AssetKind = AssetKind::Image;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    super::any_asset_conversions!(Image);
}

impl BinaryResourceAsset for ImageAsset {
    fn binary_resource_identifier(&self) -> &Identifier {
        &self.binary_resource_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn test_new_image_asset() {
        let mut issuer = IdentifierProvider::new();
        let asset = ImageAsset::new("Tree", Identifier::new("r1"), &mut issuer).unwrap();
        assert_eq!(asset.name(), "Tree");
        assert_eq!(asset.binary_resource_identifier(), &Identifier::new("r1"));
        assert!(issuer.contains(asset.identifier()));
        // The resource identifier is only a reference, not issued here
        assert!(!issuer.contains(&Identifier::new("r1")));
    }

    #[test]
    fn test_record_fields() {
        let mut issuer = IdentifierProvider::new();
        let asset = ImageAsset::new("Tree", Identifier::new("r1"), &mut issuer).unwrap();
        let text = String::from_utf8(codec::encode_record(&asset, false).unwrap()).unwrap();
        assert!(text.contains("name: \"Tree\""));
        assert!(text.contains("binary_resource_identifier: \"r1\""));

        let decoded: ImageAsset = codec::decode_record(text.as_bytes()).unwrap();
        assert_eq!(decoded, asset);
    }
}
