//! Asset Library - typed storage of asset records
//!
//! Assets are keyed by `(kind, identifier)`. On disk the library is the
//! `AssetLibrary/` directory with one subdirectory per type key and one
//! record file per asset:
//!
//! ```text
//! AssetLibrary/
//! ├── image.v1/
//! │   └── <identifier>.ron
//! └── sprite-sheet.v1/
//!     └── <identifier>.ron
//! ```

use std::collections::BTreeMap;

use super::{AnyAsset, Asset, AssetError, AssetKind};
use crate::codec::RECORD_EXTENSION;
use crate::identifier::Identifier;
use crate::package::{split_file_name, Directory, Entry};

/// A library of typed assets
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AssetLibrary {
    /// One namespace per kind; identifiers are unique within a namespace
    namespaces: BTreeMap<AssetKind, BTreeMap<Identifier, AnyAsset>>,
}

impl AssetLibrary {
    /// Create a new empty asset library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset, replacing any asset of the same kind and identifier
    pub fn add<T: Asset>(&mut self, asset: T) -> Option<T> {
        self.add_any(asset.into_any()).and_then(T::from_any)
    }

    /// Add a type-erased asset, returning the one it replaced
    pub fn add_any(&mut self, asset: AnyAsset) -> Option<AnyAsset> {
        self.namespaces
            .entry(asset.kind())
            .or_default()
            .insert(asset.identifier().clone(), asset)
    }

    /// All assets of one type, ordered by identifier
    pub fn assets<'a, T: Asset + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.namespaces
            .get(&T::KIND)
            .into_iter()
            .flat_map(|namespace| namespace.values())
            .filter_map(T::from_any_ref)
    }

    /// Get an asset of a known type
    pub fn get<T: Asset>(&self, identifier: &Identifier) -> Option<&T> {
        self.namespaces
            .get(&T::KIND)
            .and_then(|namespace| namespace.get(identifier))
            .and_then(T::from_any_ref)
    }

    /// Get a mutable reference to an asset of a known type
    pub fn get_mut<T: Asset>(&mut self, identifier: &Identifier) -> Option<&mut T> {
        self.namespaces
            .get_mut(&T::KIND)
            .and_then(|namespace| namespace.get_mut(identifier))
            .and_then(T::from_any_mut)
    }

    /// Find an asset in any namespace
    pub fn get_any(&self, identifier: &Identifier) -> Option<&AnyAsset> {
        self.namespaces
            .values()
            .find_map(|namespace| namespace.get(identifier))
    }

    pub fn get_any_mut(&mut self, identifier: &Identifier) -> Option<&mut AnyAsset> {
        self.namespaces
            .values_mut()
            .find_map(|namespace| namespace.get_mut(identifier))
    }

    pub fn contains(&self, kind: AssetKind, identifier: &Identifier) -> bool {
        self.namespaces
            .get(&kind)
            .map(|namespace| namespace.contains_key(identifier))
            .unwrap_or(false)
    }

    /// Remove an asset of a known type
    pub fn remove<T: Asset>(&mut self, identifier: &Identifier) -> Option<T> {
        self.remove_any(T::KIND, identifier).and_then(T::from_any)
    }

    pub fn remove_any(&mut self, kind: AssetKind, identifier: &Identifier) -> Option<AnyAsset> {
        let namespace = self.namespaces.get_mut(&kind)?;
        let removed = namespace.remove(identifier);
        if namespace.is_empty() {
            self.namespaces.remove(&kind);
        }
        removed
    }

    /// Get the number of assets in the library
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    /// Number of assets of one kind
    pub fn count(&self, kind: AssetKind) -> usize {
        self.namespaces.get(&kind).map(BTreeMap::len).unwrap_or(0)
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all assets, grouped by kind
    pub fn iter(&self) -> impl Iterator<Item = &AnyAsset> {
        self.namespaces.values().flat_map(|namespace| namespace.values())
    }

    /// Serialize into one subdirectory per kind
    pub fn to_package(&self, compress: bool) -> Result<Directory, AssetError> {
        let mut directory = Directory::new();
        for (kind, namespace) in &self.namespaces {
            let mut kind_dir = Directory::new();
            for (identifier, asset) in namespace {
                let bytes = asset.encode(compress).map_err(|source| AssetError::Encode {
                    identifier: identifier.clone(),
                    source,
                })?;
                kind_dir.insert_file(format!("{}.{}", identifier, RECORD_EXTENSION), bytes);
            }
            directory.insert_directory(kind.type_key(), kind_dir);
        }
        Ok(directory)
    }

    /// Deserialize the subdirectories of the expected kinds.
    ///
    /// Any record that fails to decode fails the whole load. Subdirectories
    /// of kinds not listed in `expected` are left alone.
    pub fn from_package(directory: &Directory, expected: &[AssetKind]) -> Result<Self, AssetError> {
        let mut library = Self::new();

        for (name, _) in directory.entries() {
            let known = expected.iter().any(|kind| kind.type_key() == name);
            if !known {
                tracing::debug!(entry = name, "ignoring asset directory of an unexpected kind");
            }
        }

        for &kind in expected {
            let Some(entry) = directory.get(kind.type_key()) else {
                continue;
            };
            let Entry::Directory(kind_dir) = entry else {
                return Err(AssetError::UnexpectedEntry {
                    kind,
                    name: kind.type_key().to_string(),
                });
            };

            for (file, entry) in kind_dir.entries() {
                let (Entry::File(bytes), Some((stem, RECORD_EXTENSION))) = (entry, split_file_name(file)) else {
                    return Err(AssetError::UnexpectedEntry {
                        kind,
                        name: file.to_string(),
                    });
                };
                let asset = AnyAsset::decode(kind, bytes).map_err(|source| AssetError::Decode {
                    kind,
                    file: file.to_string(),
                    source,
                })?;
                if asset.identifier().as_str() != stem {
                    return Err(AssetError::IdentifierMismatch {
                        file: file.to_string(),
                        found: asset.identifier().clone(),
                    });
                }
                library.add_any(asset);
            }
        }

        tracing::debug!(assets = library.len(), "loaded asset library");
        Ok(library)
    }
}
