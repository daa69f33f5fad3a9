//! Filesystem backend for packages
//!
//! Saving is all-or-nothing: the package is written into a staging directory
//! next to the target and renamed into place. An existing package at the
//! target is moved aside first and restored if the final rename fails.

use std::fs;
use std::path::Path;

use super::{Directory, Entry, PackageError};

fn io_error(path: &Path, source: std::io::Error) -> PackageError {
    PackageError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl Directory {
    /// Write the package to `path`, replacing whatever is there
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), PackageError> {
        let target = path.as_ref();
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| io_error(&parent, e))?;

        let staging = tempfile::Builder::new()
            .prefix(".gamedoc-staging-")
            .tempdir_in(&parent)
            .map_err(|e| io_error(&parent, e))?;
        let staged = staging.path().join("package");
        write_directory(self, &staged)?;

        if target.exists() {
            // Dropping `backup` removes the old package once the swap succeeded
            let backup = tempfile::Builder::new()
                .prefix(".gamedoc-previous-")
                .tempdir_in(&parent)
                .map_err(|e| io_error(&parent, e))?;
            let previous = backup.path().join("package");
            fs::rename(target, &previous).map_err(|e| io_error(target, e))?;
            if let Err(e) = fs::rename(&staged, target) {
                if let Err(restore) = fs::rename(&previous, target) {
                    tracing::error!(path = %target.display(), error = %restore, "failed to restore previous package");
                }
                return Err(io_error(target, e));
            }
        } else {
            fs::rename(&staged, target).map_err(|e| io_error(target, e))?;
        }

        tracing::debug!(path = %target.display(), entries = self.len(), "package written");
        Ok(())
    }

    /// Read a package directory recursively. Hidden entries (leading `.`) are skipped.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, PackageError> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| io_error(path, e))?;
        if !metadata.is_dir() {
            return Err(PackageError::NotADirectory(path.display().to_string()));
        }
        read_directory(path)
    }
}

fn write_directory(directory: &Directory, path: &Path) -> Result<(), PackageError> {
    fs::create_dir_all(path).map_err(|e| io_error(path, e))?;
    for (name, entry) in directory.entries() {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(PackageError::InvalidName(name.to_string()));
        }
        let entry_path = path.join(name);
        match entry {
            Entry::File(contents) => {
                fs::write(&entry_path, contents).map_err(|e| io_error(&entry_path, e))?;
            }
            Entry::Directory(sub) => write_directory(sub, &entry_path)?,
        }
    }
    Ok(())
}

fn read_directory(path: &Path) -> Result<Directory, PackageError> {
    let mut directory = Directory::new();
    let entries = fs::read_dir(path).map_err(|e| io_error(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_error(path, e))?;
        let entry_path = entry.path();
        let name = entry
            .file_name()
            .into_string()
            .map_err(|raw| PackageError::InvalidName(raw.to_string_lossy().into_owned()))?;
        if name.starts_with('.') {
            tracing::debug!(path = %entry_path.display(), "skipping hidden entry");
            continue;
        }

        let file_type = entry.file_type().map_err(|e| io_error(&entry_path, e))?;
        if file_type.is_dir() {
            directory.insert_directory(name, read_directory(&entry_path)?);
        } else {
            let contents = fs::read(&entry_path).map_err(|e| io_error(&entry_path, e))?;
            directory.insert_file(name, contents);
        }
    }
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Directory {
        let mut inner = Directory::new();
        inner.insert_file("b.bin", vec![1, 2, 3]);
        let mut dir = Directory::new();
        dir.insert_file("a.ron", b"()".to_vec());
        dir.insert_directory("Inner", inner);
        dir
    }

    #[test]
    fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("Project.gamedoc");
        sample().write_to(&target).unwrap();

        assert!(target.join("Inner").join("b.bin").is_file());
        assert_eq!(Directory::read_from(&target).unwrap(), sample());
    }

    #[test]
    fn test_overwrite_replaces_previous_package() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("Project.gamedoc");
        sample().write_to(&target).unwrap();

        let mut replacement = Directory::new();
        replacement.insert_file("only.ron", b"()".to_vec());
        replacement.write_to(&target).unwrap();

        assert_eq!(Directory::read_from(&target).unwrap(), replacement);
        // No staging leftovers next to the package
        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_invalid_name_leaves_target_untouched() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("Project.gamedoc");
        sample().write_to(&target).unwrap();

        let mut bad = Directory::new();
        bad.insert_file("../escape", vec![0]);
        assert!(matches!(bad.write_to(&target), Err(PackageError::InvalidName(_))));
        assert_eq!(Directory::read_from(&target).unwrap(), sample());
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".DS_Store"), "x").unwrap();
        fs::write(tmp.path().join("a.ron"), "()").unwrap();
        let dir = Directory::read_from(tmp.path()).unwrap();
        assert_eq!(dir.len(), 1);
        assert!(dir.contains("a.ron"));
    }

    #[test]
    fn test_read_missing_path() {
        let tmp = TempDir::new().unwrap();
        let result = Directory::read_from(tmp.path().join("missing"));
        assert!(matches!(result, Err(PackageError::Io { .. })));
    }
}
