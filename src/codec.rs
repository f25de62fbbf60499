//! Content codec module
//!
//! A codec ties a sidecar file suffix (`.gz`) to the token used in
//! `Accept-Encoding` / `Content-Encoding` (`gzip`). The order of the
//! registry is the negotiation priority: the first acceptable codec wins.

use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::Arc;

/// Boxed byte stream handed to and returned by decoders
pub type ByteStream = Box<dyn Read + Send>;

/// Turns a compressed stream into the raw one
pub type DecodeFn = Arc<dyn Fn(ByteStream) -> io::Result<ByteStream> + Send + Sync>;

/// Compresses raw content, only used while building the index
pub type EncodeFn = Arc<dyn Fn(&mut dyn Read) -> io::Result<Vec<u8>> + Send + Sync>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression scheme description
#[derive(Clone)]
pub struct Codec {
    /// Sidecar suffix, e.g. `.gz`
    pub suffix: String,
    /// Lower-case encoding token, e.g. `gzip`
    pub wire_name: String,
    /// `None` disables transparent decompression for this codec
    pub decoder: Option<DecodeFn>,
    /// `None` excludes this codec from encode-on-init
    pub encoder: Option<EncodeFn>,
}

impl Codec {
    pub fn new(suffix: impl Into<String>, wire_name: &str) -> Self {
        Self {
            suffix: suffix.into(),
            wire_name: wire_name.to_ascii_lowercase(),
            decoder: None,
            encoder: None,
        }
    }

    #[must_use]
    pub fn with_decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(ByteStream) -> io::Result<ByteStream> + Send + Sync + 'static,
    {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    #[must_use]
    pub fn with_encoder<F>(mut self, encoder: F) -> Self
    where
        F: Fn(&mut dyn Read) -> io::Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// Built-in gzip codec
    pub fn gzip() -> Self {
        Self::new(".gz", "gzip")
            .with_decoder(gzip_decode)
            .with_encoder(gzip_encode)
    }

    /// Brotli codec, usually prepended so it is preferred over gzip
    pub fn brotli() -> Self {
        Self::new(".br", "br")
            .with_decoder(|r| Ok(Box::new(brotli::Decompressor::new(r, 4096)) as ByteStream))
            .with_encoder(brotli_encode)
    }

    /// Check whether a lower-cased `Accept-Encoding` value mentions this codec
    ///
    /// Plain substring match, quality values are not interpreted.
    pub fn accepted_by(&self, accept_encoding: &str) -> bool {
        accept_encoding.contains(self.wire_name.as_str())
    }

    /// Sidecar path for a logical asset path
    pub fn sidecar(&self, path: &str) -> String {
        format!("{path}{}", self.suffix)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("suffix", &self.suffix)
            .field("wire_name", &self.wire_name)
            .field("decoder", &self.decoder.is_some())
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

/// Ordered list of codecs, first is preferred
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: Vec<Codec>,
}

impl CodecRegistry {
    /// Registry without any codec, only native files are served
    pub const fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec with the lowest priority
    pub fn append(&mut self, codec: Codec) {
        self.codecs.push(codec);
    }

    /// Add a codec with the highest priority
    pub fn prepend(&mut self, codec: Codec) {
        self.codecs.insert(0, codec);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Codec> {
        self.codecs.iter()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Whether a path is the sidecar of some registered codec
    pub fn is_sidecar(&self, path: &str) -> bool {
        self.codecs.iter().any(|c| path.ends_with(c.suffix.as_str()))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self {
            codecs: vec![Codec::gzip()],
        }
    }
}

impl<'a> IntoIterator for &'a CodecRegistry {
    type Item = &'a Codec;
    type IntoIter = std::slice::Iter<'a, Codec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Open a gzip stream, failing early when the magic bytes are missing
fn gzip_decode(r: ByteStream) -> io::Result<ByteStream> {
    let mut reader = BufReader::new(r);
    if !reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "gzip: invalid header",
        ));
    }
    Ok(Box::new(MultiGzDecoder::new(reader)))
}

fn gzip_encode(r: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    io::copy(r, &mut encoder)?;
    encoder.finish()
}

fn brotli_encode(r: &mut dyn Read) -> io::Result<Vec<u8>> {
    let mut compressed = Vec::new();
    {
        let mut encoder = brotli::CompressorWriter::new(&mut compressed, 4096, 11, 22);
        io::copy(r, &mut encoder)?;
        encoder.flush()?;
    }
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &Codec, data: Vec<u8>) -> io::Result<Vec<u8>> {
        let decoder = codec.decoder.as_ref().unwrap();
        let mut out = Vec::new();
        decoder(Box::new(io::Cursor::new(data)))?.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_default_registry() {
        let registry = CodecRegistry::default();
        assert_eq!(registry.len(), 1);
        let gzip = registry.iter().next().unwrap();
        assert_eq!(gzip.suffix, ".gz");
        assert_eq!(gzip.wire_name, "gzip");
    }

    #[test]
    fn test_prepend_takes_priority() {
        let mut registry = CodecRegistry::default();
        registry.prepend(Codec::brotli());
        let suffixes: Vec<_> = registry.iter().map(|c| c.suffix.as_str()).collect();
        assert_eq!(suffixes, vec![".br", ".gz"]);

        registry.append(Codec::new(".zst", "zstd"));
        let suffixes: Vec<_> = registry.iter().map(|c| c.suffix.as_str()).collect();
        assert_eq!(suffixes, vec![".br", ".gz", ".zst"]);
    }

    #[test]
    fn test_wire_name_lowercased() {
        let codec = Codec::new(".gz", "GZip");
        assert_eq!(codec.wire_name, "gzip");
        assert!(codec.accepted_by("deflate, gzip;q=0.8"));
        assert!(!codec.accepted_by("identity"));
    }

    #[test]
    fn test_is_sidecar() {
        let mut registry = CodecRegistry::default();
        registry.prepend(Codec::brotli());
        assert!(registry.is_sidecar("app.js.gz"));
        assert!(registry.is_sidecar("app.js.br"));
        assert!(!registry.is_sidecar("app.js"));
        assert!(!CodecRegistry::empty().is_sidecar("app.js.gz"));
    }

    #[test]
    fn test_gzip_roundtrip() {
        let codec = Codec::gzip();
        let raw = b"hello hello hello hello".to_vec();
        let encoded = (codec.encoder.as_ref().unwrap())(&mut raw.as_slice()).unwrap();
        assert!(encoded.starts_with(&GZIP_MAGIC));
        assert_eq!(decode_all(&codec, encoded).unwrap(), raw);
    }

    #[test]
    fn test_gzip_invalid_header() {
        let err = decode_all(&Codec::gzip(), b"not gzip at all".to_vec()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "gzip: invalid header");
    }

    #[test]
    fn test_brotli_roundtrip() {
        let codec = Codec::brotli();
        let raw = b"{\"openapi\":\"3.0.0\",\"paths\":{}}".repeat(20);
        let encoded = (codec.encoder.as_ref().unwrap())(&mut raw.as_slice()).unwrap();
        assert!(encoded.len() < raw.len());
        assert_eq!(decode_all(&codec, encoded).unwrap(), raw);
    }

    #[test]
    fn test_codec_without_transforms() {
        let codec = Codec::new(".zst", "zstd");
        assert!(codec.decoder.is_none());
        assert!(codec.encoder.is_none());
        assert_eq!(codec.sidecar("app.js"), "app.js.zst");
    }
}
