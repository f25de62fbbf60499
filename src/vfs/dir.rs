//! Directory-backed file tree

use super::{AssetEntry, AssetFs, AssetReader};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

/// Serves files below a directory on disk
#[derive(Debug, Clone)]
pub struct DirFs {
    root: PathBuf,
}

impl DirFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a relative asset path below the root
    ///
    /// Only plain components are accepted, anything that could climb out
    /// of the root (`..`, absolute prefixes) is rejected.
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("path escapes asset root: {path}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetFs for DirFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<AssetEntry>> {
        let dir = self.resolve(path)?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(ToString::to_string) else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name in {}", dir.display()),
                ));
            };
            // Follow symlinks so a linked directory is walked like a real one
            let is_dir = fs::metadata(entry.path())?.is_dir();
            entries.push(AssetEntry { name, is_dir });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &str) -> io::Result<AssetReader> {
        let file = File::open(self.resolve(path)?)?;
        Ok(AssetReader::Seekable(Box::new(file)))
    }
}
