//! Asset index module
//!
//! Walks the file tree once and records a validator and size for every
//! stored file, sidecars included. The resulting table is never mutated.

use crate::codec::CodecRegistry;
use crate::http::cache;
use crate::vfs::{self, AssetFs};
use hyper::body::Bytes;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

/// Errors aborting index construction
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to list directory '{path}': {source}")]
    ReadDir { path: String, source: io::Error },
    #[error("failed to open '{path}': {source}")]
    Open { path: String, source: io::Error },
    #[error("failed to read '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to encode '{path}' as {encoding}: {source}")]
    Encode {
        path: String,
        encoding: String,
        source: io::Error,
    },
}

/// One stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Base-36 content hash, used as `ETag`
    pub hash: String,
    /// Length of the stored bytes
    pub size: u64,
    /// Bytes of a sidecar produced at startup, `None` for files on the tree
    pub content: Option<Bytes>,
}

/// Immutable path → record table
#[derive(Debug, Default)]
pub struct AssetIndex {
    records: HashMap<String, FileRecord>,
}

impl AssetIndex {
    /// Walk the whole tree below the root
    pub fn build(fs: &dyn AssetFs) -> Result<Self, IndexError> {
        let mut records = HashMap::new();
        hash_dir(fs, "", &mut records)?;
        Ok(Self { records })
    }

    /// Walk the tree, then encode originals lacking a sidecar
    pub fn build_encoded(fs: &dyn AssetFs, codecs: &CodecRegistry) -> Result<Self, IndexError> {
        let mut index = Self::build(fs)?;
        index.encode_missing(fs, codecs)?;
        Ok(index)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total stored bytes, synthetic sidecars included
    pub fn total_size(&self) -> u64 {
        self.records.values().map(|r| r.size).sum()
    }

    /// Register an in-memory sidecar for each original without one
    ///
    /// The sidecar validator is the original's hash followed by the codec
    /// suffix, so it never collides with the original's own validator.
    fn encode_missing(&mut self, fs: &dyn AssetFs, codecs: &CodecRegistry) -> Result<(), IndexError> {
        let mut originals: Vec<(String, String)> = self
            .records
            .iter()
            .filter(|(path, _)| !codecs.is_sidecar(path))
            .map(|(path, record)| (path.clone(), record.hash.clone()))
            .collect();
        originals.sort();

        for codec in codecs {
            let Some(encode) = &codec.encoder else {
                continue;
            };

            for (path, hash) in &originals {
                let sidecar = codec.sidecar(path);
                if self.records.contains_key(&sidecar) {
                    continue;
                }

                let mut reader = fs
                    .open(path)
                    .map_err(|source| IndexError::Open {
                        path: path.clone(),
                        source,
                    })?
                    .into_read();
                let encoded = encode(&mut reader).map_err(|source| IndexError::Encode {
                    path: path.clone(),
                    encoding: codec.wire_name.clone(),
                    source,
                })?;

                self.records.insert(
                    sidecar,
                    FileRecord {
                        hash: format!("{hash}{}", codec.suffix),
                        size: encoded.len() as u64,
                        content: Some(Bytes::from(encoded)),
                    },
                );
            }
        }

        Ok(())
    }
}

fn hash_dir(
    fs: &dyn AssetFs,
    dir: &str,
    records: &mut HashMap<String, FileRecord>,
) -> Result<(), IndexError> {
    let entries = fs.read_dir(dir).map_err(|source| IndexError::ReadDir {
        path: dir.to_string(),
        source,
    })?;

    for entry in entries {
        let path = vfs::join(dir, &entry.name);

        if entry.is_dir {
            hash_dir(fs, &path, records)?;
            continue;
        }

        let mut reader = fs
            .open(&path)
            .map_err(|source| IndexError::Open {
                path: path.clone(),
                source,
            })?
            .into_read();
        let (hash, size) = cache::hash_stream(&mut reader).map_err(|source| IndexError::Read {
            path: path.clone(),
            source,
        })?;

        records.insert(
            path,
            FileRecord {
                hash,
                size,
                content: None,
            },
        );
    }

    Ok(())
}
