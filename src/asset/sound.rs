use serde::{Deserialize, Serialize};

use super::{Asset, AssetKind, PrimitiveAsset};
use crate::identifier::{Identifier, IdentifierError, IdentifierProvider};

/// Sound effect metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundAsset {
    pub name: String,
    identifier: Identifier,
    /// Playback volume (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_volume() -> f32 {
    1.0
}

impl SoundAsset {
    pub fn new(name: impl Into<String>, issuer: &mut IdentifierProvider) -> Result<Self, IdentifierError> {
        Ok(Self {
            name: name.into(),
            identifier: issuer.new_identifier()?,
            volume: default_volume(),
        })
    }

    /// Set volume, clamped to 0.0 - 1.0
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

impl Asset for SoundAsset {
    const KIND: AssetKind = AssetKind::Sound;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    super::any_asset_conversions!(Sound);
}

impl PrimitiveAsset for SoundAsset {}
