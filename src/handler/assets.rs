//! Asset server construction
//!
//! The server owns the file tree, the codec registry and the index. All
//! three are fixed once `build` returns, so a built server can be shared
//! between request handlers without locking.

use super::router::RequestContext;
use crate::codec::{Codec, CodecRegistry};
use crate::http;
use crate::index::{AssetIndex, IndexError};
use crate::logger;
use crate::vfs::AssetFs;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::io;
use std::time::Instant;

/// Strategy invoked when serving an asset fails after negotiation
///
/// The hook receives the response as prepared so far and decides what the
/// client gets; leaving it untouched sends it as is.
pub trait ErrorHook: Send + Sync {
    fn handle_failure(
        &self,
        response: &mut Response<Full<Bytes>>,
        request: &RequestContext<'_>,
        error: &io::Error,
    );
}

impl<F> ErrorHook for F
where
    F: Fn(&mut Response<Full<Bytes>>, &RequestContext<'_>, &io::Error) + Send + Sync,
{
    fn handle_failure(
        &self,
        response: &mut Response<Full<Bytes>>,
        request: &RequestContext<'_>,
        error: &io::Error,
    ) {
        self(response, request, error);
    }
}

/// Logs the failure and answers with a bare 500
#[derive(Debug, Default, Clone, Copy)]
pub struct InternalErrorHook;

impl ErrorHook for InternalErrorHook {
    fn handle_failure(
        &self,
        response: &mut Response<Full<Bytes>>,
        request: &RequestContext<'_>,
        error: &io::Error,
    ) {
        logger::log_error(&format!("Failed to serve '/{}': {error}", request.path));
        *response = http::build_500_response();
    }
}

/// Serves pre-compressed static assets
pub struct AssetServer {
    pub(super) fs: Box<dyn AssetFs>,
    pub(super) index: AssetIndex,
    pub(super) codecs: CodecRegistry,
    pub(super) on_error: Box<dyn ErrorHook>,
}

impl AssetServer {
    /// Start configuring a server over a file tree
    pub fn builder(fs: impl AssetFs + 'static) -> AssetServerBuilder {
        AssetServerBuilder {
            fs: Box::new(fs),
            codecs: CodecRegistry::default(),
            on_error: Box::new(InternalErrorHook),
            encode_on_init: false,
        }
    }

    /// Server with default settings: gzip only, no encoding at startup
    pub fn new(fs: impl AssetFs + 'static) -> Result<Self, IndexError> {
        Self::builder(fs).build()
    }

    pub const fn index(&self) -> &AssetIndex {
        &self.index
    }

    pub const fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }
}

/// Accumulates options, applied in call order
pub struct AssetServerBuilder {
    fs: Box<dyn AssetFs>,
    codecs: CodecRegistry,
    on_error: Box<dyn ErrorHook>,
    encode_on_init: bool,
}

impl AssetServerBuilder {
    /// Replace the failure strategy
    #[must_use]
    pub fn on_error(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.on_error = Box::new(hook);
        self
    }

    /// Register a codec after the existing ones
    #[must_use]
    pub fn append_codec(mut self, codec: Codec) -> Self {
        self.codecs.append(codec);
        self
    }

    /// Register a codec ahead of the existing ones
    #[must_use]
    pub fn prepend_codec(mut self, codec: Codec) -> Self {
        self.codecs.prepend(codec);
        self
    }

    /// Prefer brotli over every codec registered so far
    #[must_use]
    pub fn with_brotli(self) -> Self {
        self.prepend_codec(Codec::brotli())
    }

    /// Replace the whole registry, the built-in gzip included
    #[must_use]
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Compress originals lacking a sidecar while indexing
    #[must_use]
    pub const fn encode_on_init(mut self, enabled: bool) -> Self {
        self.encode_on_init = enabled;
        self
    }

    /// Index the file tree
    ///
    /// Any listing or read error aborts: a server never runs on a partial
    /// index.
    pub fn build(self) -> Result<AssetServer, IndexError> {
        let started = Instant::now();
        let index = if self.encode_on_init {
            AssetIndex::build_encoded(self.fs.as_ref(), &self.codecs)?
        } else {
            AssetIndex::build(self.fs.as_ref())?
        };
        logger::log_index_built(index.len(), index.total_size(), started.elapsed());

        Ok(AssetServer {
            fs: self.fs,
            index,
            codecs: self.codecs,
            on_error: self.on_error,
        })
    }
}
