//! Pre-compressed static asset server
//!
//! Serves a file tree where assets may be stored next to compressed
//! sidecars (`app.js.gz`, `app.js.br`). Each request gets the sidecar the
//! client accepts, the original file, or a sidecar decompressed on the fly,
//! with content-hash `ETag`s computed once at startup.

pub mod codec;
pub mod config;
pub mod handler;
pub mod http;
pub mod index;
pub mod logger;
pub mod server;
pub mod vfs;

pub use codec::{Codec, CodecRegistry};
pub use handler::{AssetServer, AssetServerBuilder, ErrorHook, RequestContext};
pub use index::{AssetIndex, IndexError};
pub use vfs::{AssetFs, DirFs, MemFs};
