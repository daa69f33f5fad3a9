//! Typed asset records
//!
//! Every asset has a user-facing `name` and an immutable `identifier` minted
//! by the document's issuer. The supported kinds form a closed set:
//!
//! ```text
//! Asset
//! ├── PrimitiveAsset          self-contained metadata      (SoundAsset)
//! ├── BinaryResourceAsset     + binary resource reference  (ImageAsset)
//! └── CompositeAsset          + dependencies on assets
//!     └── CompositeImageAsset + scale factor               (SpriteSheetAsset)
//! ```
//!
//! Each kind has an explicit, versioned type key that names its directory in
//! the package, so the on-disk layout never depends on runtime type metadata.

mod image_asset;
mod import;
mod library;
mod sound;
mod sprite_sheet;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::codec::{self, CodecError};
use crate::identifier::{Identifier, IdentifierError, IdentifierProvider};
use crate::resource::ResourceError;

pub use image_asset::ImageAsset;
pub use import::{AssetImporter, ImageSource, ImportReport};
pub use library::AssetLibrary;
pub use sound::SoundAsset;
pub use sprite_sheet::{SpriteSheetAsset, SpriteSheetOptions};

/// Error type for asset persistence and import
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to encode asset {identifier}: {source}")]
    Encode {
        identifier: Identifier,
        #[source]
        source: CodecError,
    },

    #[error("failed to decode {kind} asset file {file}: {source}")]
    Decode {
        kind: AssetKind,
        file: String,
        #[source]
        source: CodecError,
    },

    /// The identifier stored inside an asset record differs from its file name
    #[error("asset file {file} contains identifier {found}")]
    IdentifierMismatch { file: String, found: Identifier },

    #[error("unexpected entry in {kind} assets: {name}")]
    UnexpectedEntry { kind: AssetKind, name: String },

    #[error("asset not found: {0}")]
    AssetNotFound(Identifier),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// The closed set of supported asset kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum AssetKind {
    Image,
    SpriteSheet,
    Sound,
}

impl AssetKind {
    /// Every supported kind, in package order
    pub const ALL: [AssetKind; 3] = [AssetKind::Image, AssetKind::SpriteSheet, AssetKind::Sound];

    /// Stable, versioned key naming this kind's package directory
    pub fn type_key(self) -> &'static str {
        match self {
            AssetKind::Image => "image.v1",
            AssetKind::SpriteSheet => "sprite-sheet.v1",
            AssetKind::Sound => "sound.v1",
        }
    }

    pub fn from_type_key(key: &str) -> Option<AssetKind> {
        Self::ALL.into_iter().find(|kind| kind.type_key() == key)
    }

    /// Display name for UI
    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Image => "Image",
            AssetKind::SpriteSheet => "Sprite Sheet",
            AssetKind::Sound => "Sound",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_key())
    }
}

/// Root interface of every concrete asset kind
pub trait Asset: Clone + Serialize + DeserializeOwned {
    const KIND: AssetKind;

    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn identifier(&self) -> &Identifier;

    fn into_any(self) -> AnyAsset;
    fn from_any(asset: AnyAsset) -> Option<Self>;
    fn from_any_ref(asset: &AnyAsset) -> Option<&Self>;
    fn from_any_mut(asset: &mut AnyAsset) -> Option<&mut Self>;
}

/// Assets made of metadata only
pub trait PrimitiveAsset: Asset {}

/// Assets backed by an image in the binary resource cache.
///
/// The resource identifier is a lookup key only; the asset does not own the
/// cached data.
pub trait BinaryResourceAsset: Asset {
    fn binary_resource_identifier(&self) -> &Identifier;
}

/// Options every composite asset is created with
pub trait CompositeAssetOptions {
    fn name(&self) -> &str;
}

/// Options for image-based composite assets
pub trait CompositeImageAssetOptions: CompositeAssetOptions {
    fn new(name: String, scale_factor: f32) -> Self;
    fn scale_factor(&self) -> f32;
}

/// Assets that depend on other assets by identifier
pub trait CompositeAsset: Asset {
    type Options: CompositeAssetOptions;

    fn dependencies(&self) -> &[Identifier];
    fn dependencies_mut(&mut self) -> &mut Vec<Identifier>;

    /// Create a new composite with a freshly issued identifier
    fn new_composite(
        dependencies: Vec<Identifier>,
        issuer: &mut IdentifierProvider,
        options: Self::Options,
    ) -> Result<Self, IdentifierError>;
}

/// Composite assets made of images sharing one scale factor
pub trait CompositeImageAsset: CompositeAsset {
    /// Mapping between screen points and source image pixels
    fn scale_factor(&self) -> f32;
}

/// Type-erased asset, one variant per supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum AnyAsset {
    Image(ImageAsset),
    SpriteSheet(SpriteSheetAsset),
    Sound(SoundAsset),
}

impl AnyAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            AnyAsset::Image(_) => AssetKind::Image,
            AnyAsset::SpriteSheet(_) => AssetKind::SpriteSheet,
            AnyAsset::Sound(_) => AssetKind::Sound,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyAsset::Image(a) => a.name(),
            AnyAsset::SpriteSheet(a) => a.name(),
            AnyAsset::Sound(a) => a.name(),
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            AnyAsset::Image(a) => a.set_name(name),
            AnyAsset::SpriteSheet(a) => a.set_name(name),
            AnyAsset::Sound(a) => a.set_name(name),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        match self {
            AnyAsset::Image(a) => a.identifier(),
            AnyAsset::SpriteSheet(a) => a.identifier(),
            AnyAsset::Sound(a) => a.identifier(),
        }
    }

    /// Cached resource this asset refers to, if it is resource-backed
    pub fn binary_resource_identifier(&self) -> Option<&Identifier> {
        match self {
            AnyAsset::Image(a) => Some(a.binary_resource_identifier()),
            AnyAsset::SpriteSheet(_) | AnyAsset::Sound(_) => None,
        }
    }

    /// Assets this asset depends on (empty for non-composites)
    pub fn dependencies(&self) -> &[Identifier] {
        match self {
            AnyAsset::SpriteSheet(a) => a.dependencies(),
            AnyAsset::Image(_) | AnyAsset::Sound(_) => &[],
        }
    }

    /// Serialize the concrete record (no type tag; the directory carries the kind)
    pub fn encode(&self, compress: bool) -> Result<Vec<u8>, CodecError> {
        match self {
            AnyAsset::Image(a) => codec::encode_record(a, compress),
            AnyAsset::SpriteSheet(a) => codec::encode_record(a, compress),
            AnyAsset::Sound(a) => codec::encode_record(a, compress),
        }
    }

    /// Decode a record known to be of `kind`
    pub fn decode(kind: AssetKind, data: &[u8]) -> Result<AnyAsset, CodecError> {
        Ok(match kind {
            AssetKind::Image => AnyAsset::Image(codec::decode_record(data)?),
            AssetKind::SpriteSheet => AnyAsset::SpriteSheet(codec::decode_record(data)?),
            AssetKind::Sound => AnyAsset::Sound(codec::decode_record(data)?),
        })
    }
}

/// Implements the `AnyAsset` conversions of `Asset` for one variant
macro_rules! any_asset_conversions {
    ($variant:ident) => {
        fn into_any(self) -> $crate::asset::AnyAsset {
            $crate::asset::AnyAsset::$variant(self)
        }

        fn from_any(asset: $crate::asset::AnyAsset) -> Option<Self> {
            match asset {
                $crate::asset::AnyAsset::$variant(a) => Some(a),
                _ => None,
            }
        }

        fn from_any_ref(asset: &$crate::asset::AnyAsset) -> Option<&Self> {
            match asset {
                $crate::asset::AnyAsset::$variant(a) => Some(a),
                _ => None,
            }
        }

        fn from_any_mut(asset: &mut $crate::asset::AnyAsset) -> Option<&mut Self> {
            match asset {
                $crate::asset::AnyAsset::$variant(a) => Some(a),
                _ => None,
            }
        }
    };
}
pub(crate) use any_asset_conversions;
