//! In-memory file tree
//!
//! Useful for assets compiled into the binary and for tests.

use super::{AssetEntry, AssetFs, AssetReader};
use hyper::body::Bytes;
use std::collections::BTreeMap;
use std::io::{self, Cursor};

/// File tree held in memory, keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: BTreeMap<String, Bytes>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, intermediate directories are implied by the path
    pub fn insert(&mut self, path: &str, content: impl Into<Bytes>) {
        self.files
            .insert(path.trim_matches('/').to_string(), content.into());
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, content: impl Into<Bytes>) -> Self {
        self.insert(path, content);
        self
    }
}

impl AssetFs for MemFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<AssetEntry>> {
        let dir = path.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        // name -> is_dir, BTreeMap keeps the listing sorted and unique
        let mut children = BTreeMap::new();
        for key in self.files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((name, _)) => children.insert(name.to_string(), true),
                None => children.insert(rest.to_string(), false),
            };
        }

        if children.is_empty() && !dir.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {dir}"),
            ));
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| AssetEntry { name, is_dir })
            .collect())
    }

    fn open(&self, path: &str) -> io::Result<AssetReader> {
        self.files.get(path).map_or_else(
            || {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {path}"),
                ))
            },
            |content| Ok(AssetReader::Seekable(Box::new(Cursor::new(content.clone())))),
        )
    }
}
