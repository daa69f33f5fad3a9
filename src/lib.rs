//! gamedoc: the document core of a 2D game editor
//!
//! A project document is a directory package with four parts:
//!
//! ```text
//! <package>/
//! ├── ProjectConfiguration.ron   # project tree (folder grouping of scenes and assets)
//! ├── Scenes/                    # one record per scene
//! ├── AssetLibrary/              # one subdirectory per asset kind, one record per asset
//! └── BinaryResources/           # cached images + the shared identifier issuer
//! ```
//!
//! The editor UI drives everything through [`Document`]: tree queries and
//! mutations, asset library access, resource lookup and the package
//! save/load boundary. All state is single-writer; the document is not `Send`.

pub mod asset;
pub mod codec;
pub mod document;
pub mod identifier;
pub mod package;
pub mod resource;
pub mod settings;
pub mod tree;

pub use asset::{
    AnyAsset, Asset, AssetError, AssetImporter, AssetKind, AssetLibrary, BinaryResourceAsset,
    CompositeAsset, CompositeImageAsset, ImageAsset, ImageSource, ImportReport, PrimitiveAsset,
    SoundAsset, SpriteSheetAsset, SpriteSheetOptions,
};
pub use document::{
    Document, DocumentError, EditAction, ErrorClass, IntegrityIssue, ProjectConfiguration, Scene,
    SceneEntity, SceneError,
};
pub use identifier::{Identifier, IdentifierError, IdentifierProvider, SharedIdentifierProvider};
pub use package::{Directory, Entry, PackageError};
pub use resource::{BinaryResourceCache, ResourceError};
pub use settings::PackageSettings;
pub use tree::{NodeId, NodeMove, NodeValue, ProjectTree, TreeError};

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
