//! Representation negotiation
//!
//! Picks which stored file answers a request, in this order:
//! 1. an accepted compressed sidecar, sent verbatim with `Content-Encoding`;
//! 2. the uncompressed original;
//! 3. a sidecar whose codec can decode it, sent decompressed.

use crate::codec::{CodecRegistry, DecodeFn};
use crate::http::cache;
use crate::index::{AssetIndex, FileRecord};
use std::borrow::Cow;

/// Which branch of the negotiation matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Sidecar bytes in an encoding the agent accepts
    Compressed,
    /// Original file
    Native,
    /// Sidecar decoded on the fly
    Decoded,
}

/// Chosen representation of an asset
pub struct Resolution<'a> {
    /// Logical path, drives `Content-Type`
    pub path: &'a str,
    /// Suffix of the stored file, empty for the original
    pub suffix: &'a str,
    /// `Content-Encoding` value, empty when none is sent
    pub encoding: &'a str,
    pub record: &'a FileRecord,
    pub etag: Cow<'a, str>,
    pub decoder: Option<&'a DecodeFn>,
    pub representation: Representation,
    /// Another request could get a different body for the same path
    pub varies: bool,
}

impl Resolution<'_> {
    /// Path of the stored file backing this representation
    pub fn stored_path(&self) -> String {
        format!("{}{}", self.path, self.suffix)
    }
}

/// Resolve a request path against the index
///
/// `accept_encoding` is the raw header value, empty when absent.
pub fn negotiate<'a>(
    index: &'a AssetIndex,
    codecs: &'a CodecRegistry,
    path: &'a str,
    accept_encoding: &str,
) -> Option<Resolution<'a>> {
    if !accept_encoding.is_empty() {
        let accept_encoding = accept_encoding.to_ascii_lowercase();

        for codec in codecs {
            if !codec.accepted_by(&accept_encoding) {
                continue;
            }
            let Some(record) = index.get(&codec.sidecar(path)) else {
                continue;
            };

            return Some(Resolution {
                path,
                suffix: &codec.suffix,
                encoding: &codec.wire_name,
                record,
                etag: Cow::Borrowed(&record.hash),
                decoder: None,
                representation: Representation::Compressed,
                varies: true,
            });
        }
    }

    if let Some(record) = index.get(path) {
        return Some(Resolution {
            path,
            suffix: "",
            encoding: "",
            record,
            etag: Cow::Borrowed(&record.hash),
            decoder: None,
            representation: Representation::Native,
            varies: codecs.iter().any(|c| index.contains(&c.sidecar(path))),
        });
    }

    codecs.iter().find_map(|codec| {
        let decoder = codec.decoder.as_ref()?;
        let record = index.get(&codec.sidecar(path))?;

        Some(Resolution {
            path,
            suffix: &codec.suffix,
            encoding: "",
            record,
            etag: Cow::Owned(cache::decoded_etag(&record.hash)),
            decoder: Some(decoder),
            representation: Representation::Decoded,
            varies: true,
        })
    })
}
