//! Binary resource cache
//!
//! Holds the raw bytes of every image imported into a document, keyed by an
//! identifier minted from the document's shared issuer. Assets refer to
//! cached images by identifier only; removing an asset never removes its
//! image.
//!
//! On disk the cache is the `BinaryResources/` directory: one
//! `<identifier>.<ext>` file per image plus the issuer sidecar.

use std::collections::HashMap;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use crate::identifier::{Identifier, IdentifierError, IdentifierProvider, SharedIdentifierProvider};
use crate::package::{split_file_name, Directory, Entry};

/// File name of the persisted identifier issuer
pub const ISSUER_SIDECAR: &str = "IdentifierProvider.ron";

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {0}")]
    ResourceNotFound(Identifier),

    #[error("data is not a supported image: {0}")]
    InvalidImage(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("binary resources are corrupted: {0}")]
    DataCorrupted(String),

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

#[derive(Debug, Clone)]
struct CachedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

/// Identifier-keyed store of image bytes
#[derive(Debug)]
pub struct BinaryResourceCache {
    issuer: SharedIdentifierProvider,
    images: HashMap<Identifier, CachedImage>,
    /// Identifiers in insertion order
    order: Vec<Identifier>,
}

impl BinaryResourceCache {
    /// Create an empty cache minting identifiers from `issuer`
    pub fn new(issuer: SharedIdentifierProvider) -> Self {
        Self {
            issuer,
            images: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The issuer this cache mints identifiers from
    pub fn issuer(&self) -> &SharedIdentifierProvider {
        &self.issuer
    }

    /// Store encoded image bytes under a fresh identifier.
    ///
    /// Bytes that do not decode as an image are rejected before an
    /// identifier is issued.
    pub fn add(&mut self, bytes: Vec<u8>) -> Result<Identifier, ResourceError> {
        let format = validate_image(&bytes).map_err(ResourceError::InvalidImage)?;
        let identifier = self.issuer.borrow_mut().new_identifier()?;
        self.insert(identifier.clone(), CachedImage { bytes, format });
        Ok(identifier)
    }

    /// Encode an in-memory image as PNG and store it
    pub fn add_image(&mut self, image: &DynamicImage) -> Result<Identifier, ResourceError> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(ResourceError::Encode)?;
        self.add(cursor.into_inner())
    }

    /// Raw bytes of a cached image
    pub fn get(&self, identifier: &Identifier) -> Result<&[u8], ResourceError> {
        self.images
            .get(identifier)
            .map(|image| image.bytes.as_slice())
            .ok_or_else(|| ResourceError::ResourceNotFound(identifier.clone()))
    }

    /// Decode a cached image
    pub fn decode(&self, identifier: &Identifier) -> Result<DynamicImage, ResourceError> {
        let cached = self
            .images
            .get(identifier)
            .ok_or_else(|| ResourceError::ResourceNotFound(identifier.clone()))?;
        image::load_from_memory_with_format(&cached.bytes, cached.format).map_err(ResourceError::InvalidImage)
    }

    pub fn format(&self, identifier: &Identifier) -> Option<ImageFormat> {
        self.images.get(identifier).map(|image| image.format)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.images.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Cached identifiers in insertion order
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.order.iter()
    }

    /// Serialize every image plus the issuer sidecar
    pub fn to_package(&self) -> Result<Directory, ResourceError> {
        let mut directory = Directory::new();
        for identifier in &self.order {
            if let Some(image) = self.images.get(identifier) {
                directory.insert_file(file_name(identifier, image.format), image.bytes.clone());
            }
        }
        directory.insert_file(ISSUER_SIDECAR, self.issuer.borrow().to_bytes()?);
        Ok(directory)
    }

    /// Restore a cache and its issuer from a `BinaryResources` directory.
    ///
    /// The restored issuer becomes the cache's issuer; share it with the rest
    /// of the document through [`BinaryResourceCache::issuer`].
    pub fn from_package(directory: &Directory) -> Result<Self, ResourceError> {
        let sidecar = match directory.get(ISSUER_SIDECAR) {
            Some(Entry::File(bytes)) => bytes,
            Some(Entry::Directory(_)) => {
                return Err(ResourceError::DataCorrupted(format!("{} is a directory", ISSUER_SIDECAR)))
            }
            None => return Err(ResourceError::DataCorrupted(format!("missing {}", ISSUER_SIDECAR))),
        };
        let issuer = IdentifierProvider::from_bytes(sidecar)
            .map_err(|e| ResourceError::DataCorrupted(format!("{}: {}", ISSUER_SIDECAR, e)))?
            .into_shared();

        let mut cache = Self::new(issuer);
        for (name, entry) in directory.entries() {
            if name == ISSUER_SIDECAR {
                continue;
            }
            let Entry::File(bytes) = entry else {
                return Err(ResourceError::DataCorrupted(format!("unexpected directory {}", name)));
            };
            let Some((stem, _ext)) = split_file_name(name) else {
                return Err(ResourceError::DataCorrupted(format!("unexpected file {}", name)));
            };
            let format = validate_image(bytes)
                .map_err(|e| ResourceError::DataCorrupted(format!("{} is not a valid image: {}", name, e)))?;

            let identifier = Identifier::new(stem);
            if cache.issuer.borrow_mut().register(identifier.clone()) {
                tracing::warn!(resource = %identifier, "resource identifier was unknown to the issuer; registered it");
            }
            cache.insert(
                identifier,
                CachedImage {
                    bytes: bytes.clone(),
                    format,
                },
            );
        }

        tracing::debug!(resources = cache.len(), "loaded binary resources");
        Ok(cache)
    }

    fn insert(&mut self, identifier: Identifier, image: CachedImage) {
        if self.images.insert(identifier.clone(), image).is_none() {
            self.order.push(identifier);
        }
    }
}

/// Check that bytes decode as an image and report their format
fn validate_image(bytes: &[u8]) -> Result<ImageFormat, image::ImageError> {
    let format = image::guess_format(bytes)?;
    image::load_from_memory_with_format(bytes, format)?;
    Ok(format)
}

fn file_name(identifier: &Identifier, format: ImageFormat) -> String {
    let ext = format.extensions_str().first().copied().unwrap_or("bin");
    format!("{}.{}", identifier, ext)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Encode a small solid-color PNG
    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    fn new_cache() -> BinaryResourceCache {
        BinaryResourceCache::new(IdentifierProvider::with_seed(7).into_shared())
    }

    #[test]
    fn test_add_and_get() {
        let mut cache = new_cache();
        let bytes = png_bytes(4, 4, [255, 0, 0, 255]);
        let id = cache.add(bytes.clone()).unwrap();

        assert_eq!(cache.get(&id).unwrap(), bytes.as_slice());
        assert_eq!(cache.format(&id), Some(ImageFormat::Png));
        assert!(cache.issuer().borrow().contains(&id));
        let decoded = cache.decode(&id).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn test_get_missing() {
        let cache = new_cache();
        let result = cache.get(&Identifier::new("missing"));
        assert!(matches!(result, Err(ResourceError::ResourceNotFound(_))));
    }

    #[test]
    fn test_invalid_image_mints_nothing() {
        let mut cache = new_cache();
        let result = cache.add(b"definitely not an image".to_vec());
        assert!(matches!(result, Err(ResourceError::InvalidImage(_))));
        assert!(cache.is_empty());
        assert!(cache.issuer().borrow().is_empty());
    }

    #[test]
    fn test_shared_issuer_never_collides() {
        let issuer = IdentifierProvider::new().into_shared();
        let mut cache = BinaryResourceCache::new(issuer.clone());
        let resource = cache.add(png_bytes(1, 1, [0, 0, 0, 255])).unwrap();
        let other = issuer.borrow_mut().new_identifier().unwrap();
        assert_ne!(resource, other);
        assert_eq!(issuer.borrow().len(), 2);
    }

    #[test]
    fn test_package_round_trip() {
        let mut cache = new_cache();
        let a = cache.add(png_bytes(2, 2, [1, 2, 3, 255])).unwrap();
        let b = cache.add_image(&DynamicImage::new_rgba8(3, 1)).unwrap();

        let directory = cache.to_package().unwrap();
        assert!(directory.contains(&format!("{}.png", a)));
        assert!(directory.contains(ISSUER_SIDECAR));

        let restored = BinaryResourceCache::from_package(&directory).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get(&a).unwrap(), cache.get(&a).unwrap());
        assert_eq!(restored.get(&b).unwrap(), cache.get(&b).unwrap());
        assert!(restored.issuer().borrow().contains(&a));
        assert_eq!(restored.issuer().borrow().len(), 2);
    }

    #[test]
    fn test_missing_sidecar_is_corruption() {
        let mut cache = new_cache();
        cache.add(png_bytes(1, 1, [9, 9, 9, 255])).unwrap();
        let mut directory = cache.to_package().unwrap();
        directory.remove(ISSUER_SIDECAR);

        let result = BinaryResourceCache::from_package(&directory);
        assert!(matches!(result, Err(ResourceError::DataCorrupted(_))));
    }

    #[test]
    fn test_undecodable_entry_is_corruption() {
        let cache = new_cache();
        let mut directory = cache.to_package().unwrap();
        directory.insert_file("ABC.png", b"garbage".to_vec());

        let result = BinaryResourceCache::from_package(&directory);
        assert!(matches!(result, Err(ResourceError::DataCorrupted(_))));
    }

    #[test]
    fn test_unknown_resource_is_registered() {
        let cache = new_cache();
        let mut directory = cache.to_package().unwrap();
        directory.insert_file("EXTERNAL.png", png_bytes(1, 1, [0, 0, 0, 0]));

        let restored = BinaryResourceCache::from_package(&directory).unwrap();
        assert!(restored.contains(&Identifier::new("EXTERNAL")));
        assert!(restored.issuer().borrow().contains(&Identifier::new("EXTERNAL")));
    }
}
