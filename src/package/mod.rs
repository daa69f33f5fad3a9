//! In-memory package model
//!
//! A package is a directory tree of named byte files. Subsystems serialize
//! into a [`Directory`] and read back from one; only [`Directory::write_to`]
//! and [`Directory::read_from`] touch the filesystem.

mod fs;

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing package entry: {0}")]
    MissingEntry(String),

    #[error("expected a file: {0}")]
    NotAFile(String),

    #[error("expected a directory: {0}")]
    NotADirectory(String),

    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
}

/// One entry of a package directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(Vec<u8>),
    Directory(Directory),
}

impl Entry {
    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }
}

/// A directory of named entries, sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: BTreeMap<String, Entry>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file entry
    pub fn insert_file(&mut self, name: impl Into<String>, contents: Vec<u8>) {
        self.entries.insert(name.into(), Entry::File(contents));
    }

    /// Insert or replace a subdirectory entry
    pub fn insert_directory(&mut self, name: impl Into<String>, directory: Directory) {
        self.entries.insert(name.into(), Entry::Directory(directory));
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Contents of a required file entry
    pub fn file(&self, name: &str) -> Result<&[u8], PackageError> {
        match self.entries.get(name) {
            Some(Entry::File(contents)) => Ok(contents),
            Some(Entry::Directory(_)) => Err(PackageError::NotAFile(name.to_string())),
            None => Err(PackageError::MissingEntry(name.to_string())),
        }
    }

    /// A required subdirectory entry
    pub fn directory(&self, name: &str) -> Result<&Directory, PackageError> {
        match self.entries.get(name) {
            Some(Entry::Directory(directory)) => Ok(directory),
            Some(Entry::File(_)) => Err(PackageError::NotADirectory(name.to_string())),
            None => Err(PackageError::MissingEntry(name.to_string())),
        }
    }

    /// Iterate over entries in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `name.ext` into stem and extension
pub(crate) fn split_file_name(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext))
}
