//! HTTP protocol layer module
//!
//! Protocol-level building blocks shared by the asset handler: validators,
//! MIME lookup, byte ranges and fixed-outcome responses.

pub mod cache;
pub mod content;
pub mod mime;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use content::serve_content;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_416_response,
    build_500_response,
};
