//! Read-only asset file system module
//!
//! The asset server only needs two operations from the file tree:
//! list a directory and open a file by its `/`-separated relative path.
//! Paths never carry a leading slash, and the root directory is `""`.

mod dir;
mod memory;

pub use dir::DirFs;
pub use memory::MemFs;

use std::io::{self, Read, Seek};

/// Readable and seekable stream
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Single directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    pub name: String,
    pub is_dir: bool,
}

impl AssetEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Opened asset content
pub enum AssetReader {
    /// Random access is available, Range requests can be honored
    Seekable(Box<dyn ReadSeek>),
    /// Forward-only stream (typically a decoder)
    Stream(Box<dyn Read + Send>),
}

impl AssetReader {
    /// Drop the seek capability
    pub fn into_read(self) -> Box<dyn Read + Send> {
        match self {
            Self::Seekable(r) => Box::new(r),
            Self::Stream(r) => r,
        }
    }
}

/// Read-only file tree
pub trait AssetFs: Send + Sync {
    /// List the entries of a directory, `""` being the root
    fn read_dir(&self, path: &str) -> io::Result<Vec<AssetEntry>>;

    /// Open a file for reading
    fn open(&self, path: &str) -> io::Result<AssetReader>;
}

/// Join a directory path and an entry name
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
