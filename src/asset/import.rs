//! Image import into composite assets
//!
//! Turns a batch of image files into library content: every image is cached
//! as a binary resource and wrapped in an `ImageAsset`, then one composite
//! asset (e.g. a sprite sheet) is created over all of them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Asset, AssetError, AssetLibrary, CompositeImageAsset, ImageAsset};
use crate::identifier::Identifier;
use crate::resource::{BinaryResourceCache, ResourceError};

/// One image to import: a display name and the encoded file contents
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image file; the name is the file stem
    pub fn from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        Ok(Self { name, bytes })
    }

    /// Gather image sources from files and directories.
    ///
    /// Directories are expanded one level deep, sorted by file name. Only
    /// files that decode as images are kept.
    pub fn collect<P: AsRef<Path>>(paths: &[P]) -> io::Result<Vec<Self>> {
        let mut files: Vec<PathBuf> = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                let mut entries = Vec::new();
                for entry in fs::read_dir(path)? {
                    let entry_path = entry?.path();
                    if entry_path.is_file() {
                        entries.push(entry_path);
                    }
                }
                entries.sort();
                files.extend(entries);
            } else {
                files.push(path.to_path_buf());
            }
        }

        let mut sources = Vec::new();
        for file in files {
            let source = Self::from_path(&file)?;
            if image::load_from_memory(&source.bytes).is_ok() {
                sources.push(source);
            } else {
                tracing::debug!(path = %file.display(), "not an image, skipping");
            }
        }
        Ok(sources)
    }
}

/// Result of one import batch
#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    /// The new composite asset
    pub composite: Identifier,
    /// New image assets, in source order
    pub images: Vec<Identifier>,
    /// Names of sources that were not valid images
    pub skipped: Vec<String>,
}

/// Imports images into a library through a resource cache.
///
/// The cache's issuer mints every identifier (resources and assets alike).
pub struct AssetImporter<'a> {
    cache: &'a mut BinaryResourceCache,
    library: &'a mut AssetLibrary,
}

impl<'a> AssetImporter<'a> {
    pub fn new(cache: &'a mut BinaryResourceCache, library: &'a mut AssetLibrary) -> Self {
        Self { cache, library }
    }

    /// Import `sources` as image assets plus one composite of type `T`.
    ///
    /// Returns `Ok(None)` without touching the library when there is nothing
    /// to import (no sources, or none of them is an image).
    pub fn import_composite<T: CompositeImageAsset>(
        &mut self,
        sources: Vec<ImageSource>,
        options: T::Options,
    ) -> Result<Option<ImportReport>, AssetError> {
        if sources.is_empty() {
            return Ok(None);
        }

        let mut cached: Vec<(String, Identifier)> = Vec::new();
        let mut skipped = Vec::new();
        for source in sources {
            match self.cache.add(source.bytes) {
                Ok(resource) => cached.push((source.name, resource)),
                Err(ResourceError::InvalidImage(e)) => {
                    tracing::warn!(source = %source.name, error = %e, "skipping unreadable image");
                    skipped.push(source.name);
                }
                Err(e) => return Err(e.into()),
            }
        }
        if cached.is_empty() {
            tracing::warn!(skipped = skipped.len(), "no importable images");
            return Ok(None);
        }

        let issuer = self.cache.issuer().clone();
        let mut images = Vec::with_capacity(cached.len());
        for (name, resource) in cached {
            let image = ImageAsset::new(name, resource, &mut issuer.borrow_mut())?;
            images.push(image.identifier().clone());
            self.library.add(image);
        }

        let composite = T::new_composite(images.clone(), &mut issuer.borrow_mut(), options)?;
        let composite_id = composite.identifier().clone();
        self.library.add(composite);

        tracing::debug!(
            kind = %T::KIND,
            images = images.len(),
            skipped = skipped.len(),
            "imported composite asset"
        );
        Ok(Some(ImportReport {
            composite: composite_id,
            images,
            skipped,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{BinaryResourceAsset, CompositeAsset, CompositeImageAsset, SpriteSheetAsset, SpriteSheetOptions};
    use crate::identifier::IdentifierProvider;
    use crate::resource::tests::png_bytes;
    use tempfile::TempDir;

    fn setup() -> (BinaryResourceCache, AssetLibrary) {
        (
            BinaryResourceCache::new(IdentifierProvider::new().into_shared()),
            AssetLibrary::new(),
        )
    }

    #[test]
    fn test_import_sprite_sheet() {
        let (mut cache, mut library) = setup();
        let sources = vec![
            ImageSource::new("idle", png_bytes(8, 8, [255, 0, 0, 255])),
            ImageSource::new("notes", b"plain text".to_vec()),
            ImageSource::new("run", png_bytes(8, 8, [0, 255, 0, 255])),
        ];
        let options = SpriteSheetOptions {
            name: "Hero".to_string(),
            scale_factor: 2.0,
        };

        let report = AssetImporter::new(&mut cache, &mut library)
            .import_composite::<SpriteSheetAsset>(sources, options)
            .unwrap()
            .unwrap();

        assert_eq!(report.images.len(), 2);
        assert_eq!(report.skipped, vec!["notes"]);
        assert_eq!(cache.len(), 2);
        assert_eq!(library.len(), 3);

        let sheet = library.get::<SpriteSheetAsset>(&report.composite).unwrap();
        assert_eq!(sheet.name(), "Hero");
        assert_eq!(sheet.scale_factor(), 2.0);
        assert_eq!(sheet.dependencies(), report.images.as_slice());

        let idle = library.get::<ImageAsset>(&report.images[0]).unwrap();
        assert_eq!(idle.name(), "idle");
        assert!(cache.contains(idle.binary_resource_identifier()));

        // Resources and assets come from one issuer
        let issuer = cache.issuer().borrow();
        assert_eq!(issuer.len(), 5);
    }

    #[test]
    fn test_empty_import_adds_nothing() {
        let (mut cache, mut library) = setup();
        let result = AssetImporter::new(&mut cache, &mut library)
            .import_composite::<SpriteSheetAsset>(Vec::new(), SpriteSheetOptions::default())
            .unwrap();
        assert!(result.is_none());
        assert!(library.is_empty());
        assert!(cache.issuer().borrow().is_empty());
    }

    #[test]
    fn test_collect_from_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.png"), png_bytes(2, 2, [0, 0, 0, 255])).unwrap();
        fs::write(dir.path().join("a.png"), png_bytes(2, 2, [0, 0, 0, 255])).unwrap();
        fs::write(dir.path().join("readme.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let sources = ImageSource::collect(&[dir.path()]).unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_collect_reports_io_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), png_bytes(2, 2, [0, 0, 0, 255])).unwrap();
        let missing = dir.path().join("gone");

        let result = ImageSource::collect(&[dir.path().to_path_buf(), missing]);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
