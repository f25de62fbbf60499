//! Request handler module
//!
//! Serves pre-compressed static assets: builds the file index once, then
//! answers each request with the best stored representation.

pub mod assets;
pub mod negotiate;
pub mod router;
pub mod static_files;

// Re-export main entry points
pub use assets::{AssetServer, AssetServerBuilder, ErrorHook, InternalErrorHook};
pub use negotiate::{Representation, Resolution};
pub use router::RequestContext;
