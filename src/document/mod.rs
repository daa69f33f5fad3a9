//! Project document
//!
//! Composes the subsystems into one editable document and owns the package
//! round trip:
//!
//! ```text
//! <package>/
//! ├── ProjectConfiguration.ron
//! ├── Scenes/
//! │   └── <scene-id>.ron
//! ├── AssetLibrary/
//! │   └── <type-key>/<asset-id>.ron
//! └── BinaryResources/
//!     ├── IdentifierProvider.ron
//!     └── <resource-id>.<png|jpg|bmp>
//! ```
//!
//! Saving is atomic at the target path. Loading builds a complete new
//! document or fails as a whole; [`Document::reload`] only swaps state in on
//! success.

mod config;
mod editing;
mod integrity;
mod scene;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::asset::{AssetError, AssetKind, AssetLibrary};
use crate::codec::{self, CodecError, RECORD_EXTENSION};
use crate::identifier::{Identifier, IdentifierError, IdentifierProvider, SharedIdentifierProvider};
use crate::package::{split_file_name, Directory, Entry, PackageError};
use crate::resource::{BinaryResourceCache, ResourceError};
use crate::settings::PackageSettings;
use crate::tree::{ProjectTree, TreeError};

pub use config::{ProjectConfiguration, FORMAT_VERSION};
pub use editing::EditAction;
pub use integrity::IntegrityIssue;
pub use scene::{Scene, SceneEntity, SceneError};

pub const CONFIGURATION_FILE: &str = "ProjectConfiguration.ron";
pub const SCENES_DIR: &str = "Scenes";
pub const ASSET_LIBRARY_DIR: &str = "AssetLibrary";
pub const BINARY_RESOURCES_DIR: &str = "BinaryResources";

/// How a failure should be treated by the embedding application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid tree edit; abort the edit in progress
    Structural,
    /// Missing scene, asset or resource; report at the point of use
    NotFound,
    /// Unreadable package; the document cannot be opened
    Corruption,
    /// Identifier issuance exhausted; log and report
    InternalFault,
    /// Filesystem failure while saving or loading
    Io,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorClass::Structural => "structural",
            ErrorClass::NotFound => "not found",
            ErrorClass::Corruption => "corruption",
            ErrorClass::InternalFault => "internal fault",
            ErrorClass::Io => "io",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: String,
        #[source]
        source: CodecError,
    },

    #[error("corrupted package: {0}")]
    CorruptedPackage(String),

    #[error("scene not found: {0}")]
    SceneNotFound(Identifier),

    #[error("{kind} asset not found: {identifier}")]
    AssetNotFound { kind: AssetKind, identifier: Identifier },
}

impl DocumentError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DocumentError::Tree(_) => ErrorClass::Structural,
            DocumentError::Identifier(e) => identifier_class(e),
            DocumentError::Resource(e) => resource_class(e),
            DocumentError::Asset(e) => match e {
                AssetError::AssetNotFound(_) => ErrorClass::NotFound,
                AssetError::Encode { .. } => ErrorClass::InternalFault,
                AssetError::Identifier(e) => identifier_class(e),
                AssetError::Resource(e) => resource_class(e),
                AssetError::Decode { .. } | AssetError::IdentifierMismatch { .. } | AssetError::UnexpectedEntry { .. } => {
                    ErrorClass::Corruption
                }
            },
            DocumentError::Scene(e) => match e {
                SceneError::EntityNotFound(_) => ErrorClass::NotFound,
                SceneError::Identifier(e) => identifier_class(e),
            },
            DocumentError::Package(e) => match e {
                PackageError::Io { .. } => ErrorClass::Io,
                _ => ErrorClass::Corruption,
            },
            DocumentError::Encode { .. } => ErrorClass::InternalFault,
            DocumentError::CorruptedPackage(_) => ErrorClass::Corruption,
            DocumentError::SceneNotFound(_) | DocumentError::AssetNotFound { .. } => ErrorClass::NotFound,
        }
    }
}

fn identifier_class(error: &IdentifierError) -> ErrorClass {
    match error {
        IdentifierError::InternalFault { .. } | IdentifierError::Encode(_) => ErrorClass::InternalFault,
        IdentifierError::MissingInputData | IdentifierError::Malformed(_) => ErrorClass::Corruption,
    }
}

fn resource_class(error: &ResourceError) -> ErrorClass {
    match error {
        ResourceError::ResourceNotFound(_) => ErrorClass::NotFound,
        ResourceError::InvalidImage(_) | ResourceError::DataCorrupted(_) => ErrorClass::Corruption,
        ResourceError::Encode(_) => ErrorClass::InternalFault,
        ResourceError::Identifier(e) => identifier_class(e),
    }
}

/// One open project
#[derive(Debug)]
pub struct Document {
    settings: PackageSettings,
    issuer: SharedIdentifierProvider,
    configuration: ProjectConfiguration,
    scenes: BTreeMap<Identifier, Scene>,
    library: AssetLibrary,
    resources: BinaryResourceCache,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty project with default settings
    pub fn new() -> Self {
        Self::new_with_settings(PackageSettings::default())
    }

    pub fn new_with_settings(settings: PackageSettings) -> Self {
        let mut issuer = IdentifierProvider::new();
        issuer.set_attempt_limit(settings.identifier_attempts);
        let issuer = issuer.into_shared();
        Self {
            configuration: ProjectConfiguration::new(&settings),
            resources: BinaryResourceCache::new(issuer.clone()),
            library: AssetLibrary::new(),
            scenes: BTreeMap::new(),
            issuer,
            settings,
        }
    }

    pub fn settings(&self) -> &PackageSettings {
        &self.settings
    }

    /// The issuer shared by the cache, the library and the scenes
    pub fn issuer(&self) -> &SharedIdentifierProvider {
        &self.issuer
    }

    /// Issue a fresh identifier from the shared issuer
    pub fn new_identifier(&self) -> Result<Identifier, DocumentError> {
        Ok(self.issuer.borrow_mut().new_identifier()?)
    }

    pub fn configuration(&self) -> &ProjectConfiguration {
        &self.configuration
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.configuration.project_tree
    }

    pub fn tree_mut(&mut self) -> &mut ProjectTree {
        &mut self.configuration.project_tree
    }

    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut AssetLibrary {
        &mut self.library
    }

    pub fn resources(&self) -> &BinaryResourceCache {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut BinaryResourceCache {
        &mut self.resources
    }

    pub fn scenes(&self) -> &BTreeMap<Identifier, Scene> {
        &self.scenes
    }

    pub fn scene(&self, identifier: &Identifier) -> Result<&Scene, DocumentError> {
        self.scenes
            .get(identifier)
            .ok_or_else(|| DocumentError::SceneNotFound(identifier.clone()))
    }

    pub fn scene_mut(&mut self, identifier: &Identifier) -> Result<&mut Scene, DocumentError> {
        self.scenes
            .get_mut(identifier)
            .ok_or_else(|| DocumentError::SceneNotFound(identifier.clone()))
    }

    /// Add an entity to a scene, with an identifier from the shared issuer
    pub fn create_entity(
        &mut self,
        scene: &Identifier,
        name: impl Into<String>,
        parent: Option<&Identifier>,
    ) -> Result<Identifier, DocumentError> {
        let issuer = self.issuer.clone();
        let scene = self.scene_mut(scene)?;
        let identifier = scene.create_entity(name, parent, &mut issuer.borrow_mut())?;
        Ok(identifier)
    }

    /// Serialize the whole document into a package directory
    pub fn to_package(&self) -> Result<Directory, DocumentError> {
        let compress = self.settings.compress_records;
        let mut package = Directory::new();

        let configuration = codec::encode_record(&self.configuration, compress).map_err(|source| DocumentError::Encode {
            what: CONFIGURATION_FILE.to_string(),
            source,
        })?;
        package.insert_file(CONFIGURATION_FILE, configuration);

        let mut scenes = Directory::new();
        for (identifier, scene) in &self.scenes {
            let bytes = codec::encode_record(scene, compress).map_err(|source| DocumentError::Encode {
                what: format!("scene {}", identifier),
                source,
            })?;
            scenes.insert_file(format!("{}.{}", identifier, RECORD_EXTENSION), bytes);
        }
        package.insert_directory(SCENES_DIR, scenes);

        package.insert_directory(ASSET_LIBRARY_DIR, self.library.to_package(compress)?);
        package.insert_directory(BINARY_RESOURCES_DIR, self.resources.to_package()?);

        tracing::debug!(
            scenes = self.scenes.len(),
            assets = self.library.len(),
            resources = self.resources.len(),
            "serialized document"
        );
        Ok(package)
    }

    /// Rebuild a document from a package directory.
    ///
    /// All four top-level entries must be present. Asset subdirectories are
    /// decoded for `expected_kinds` only. References between subsystems are
    /// not checked here; see [`Document::check_integrity`].
    pub fn from_package(
        package: &Directory,
        expected_kinds: &[AssetKind],
        settings: PackageSettings,
    ) -> Result<Self, DocumentError> {
        let configuration_bytes = required_file(package, CONFIGURATION_FILE)?;
        let scenes_dir = required_directory(package, SCENES_DIR)?;
        let library_dir = required_directory(package, ASSET_LIBRARY_DIR)?;
        let resources_dir = required_directory(package, BINARY_RESOURCES_DIR)?;

        let resources = BinaryResourceCache::from_package(resources_dir)?;
        let issuer = resources.issuer().clone();
        issuer.borrow_mut().set_attempt_limit(settings.identifier_attempts);

        let library = AssetLibrary::from_package(library_dir, expected_kinds)?;
        for asset in library.iter() {
            if issuer.borrow_mut().register(asset.identifier().clone()) {
                tracing::warn!(asset = %asset.identifier(), "asset identifier was unknown to the issuer; registered it");
            }
        }

        let scenes = decode_scenes(scenes_dir, &issuer)?;

        let configuration: ProjectConfiguration = codec::decode_record(configuration_bytes)
            .map_err(|e| DocumentError::CorruptedPackage(format!("{}: {}", CONFIGURATION_FILE, e)))?;
        if configuration.format_version > FORMAT_VERSION {
            return Err(DocumentError::CorruptedPackage(format!(
                "format version {} is newer than supported version {}",
                configuration.format_version, FORMAT_VERSION
            )));
        }

        tracing::debug!(
            scenes = scenes.len(),
            assets = library.len(),
            resources = resources.len(),
            nodes = configuration.project_tree.len(),
            "loaded document"
        );
        Ok(Self {
            settings,
            issuer,
            configuration,
            scenes,
            library,
            resources,
        })
    }

    /// Write the document package to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocumentError> {
        self.to_package()?.write_to(path)?;
        Ok(())
    }

    /// Open a package with default settings
    pub fn load<P: AsRef<Path>>(path: P, expected_kinds: &[AssetKind]) -> Result<Self, DocumentError> {
        Self::load_with_settings(path, expected_kinds, PackageSettings::default())
    }

    pub fn load_with_settings<P: AsRef<Path>>(
        path: P,
        expected_kinds: &[AssetKind],
        settings: PackageSettings,
    ) -> Result<Self, DocumentError> {
        let package = Directory::read_from(path)?;
        Self::from_package(&package, expected_kinds, settings)
    }

    /// Replace this document with the package at `path`.
    ///
    /// On failure the current state is left untouched.
    pub fn reload<P: AsRef<Path>>(&mut self, path: P, expected_kinds: &[AssetKind]) -> Result<(), DocumentError> {
        let loaded = Self::load_with_settings(path, expected_kinds, self.settings.clone())?;
        *self = loaded;
        Ok(())
    }
}

fn required_file<'a>(package: &'a Directory, name: &str) -> Result<&'a [u8], DocumentError> {
    package
        .file(name)
        .map_err(|e| DocumentError::CorruptedPackage(e.to_string()))
}

fn required_directory<'a>(package: &'a Directory, name: &str) -> Result<&'a Directory, DocumentError> {
    package
        .directory(name)
        .map_err(|e| DocumentError::CorruptedPackage(e.to_string()))
}

fn decode_scenes(
    directory: &Directory,
    issuer: &SharedIdentifierProvider,
) -> Result<BTreeMap<Identifier, Scene>, DocumentError> {
    let mut scenes = BTreeMap::new();
    for (name, entry) in directory.entries() {
        let (Entry::File(bytes), Some((stem, RECORD_EXTENSION))) = (entry, split_file_name(name)) else {
            return Err(DocumentError::CorruptedPackage(format!("unexpected scene entry {}", name)));
        };
        let scene: Scene = codec::decode_record(bytes)
            .map_err(|e| DocumentError::CorruptedPackage(format!("scene {}: {}", name, e)))?;

        let identifier = Identifier::new(stem);
        let mut issuer = issuer.borrow_mut();
        issuer.register(identifier.clone());
        for entity in scene.entities() {
            issuer.register(entity.identifier.clone());
        }
        scenes.insert(identifier, scene);
    }
    Ok(scenes)
}
