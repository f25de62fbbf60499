//! HTTP response building module
//!
//! Builders for the fixed-outcome responses: they never depend on the
//! asset that was requested and carry a minimal body.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

/// Body of the 405 response
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed\n\nmethod should be GET or HEAD\n";

/// Build 304 Not Modified response
///
/// Carries no validator or representation headers, the client already
/// holds them.
pub fn build_304_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(304)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(404)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from("404 Not Found\n")))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from("404 Not Found\n")))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header("Allow", "GET, HEAD")
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from(METHOD_NOT_ALLOWED_BODY)))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from(METHOD_NOT_ALLOWED_BODY)))
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(size: u64) -> Response<Full<Bytes>> {
    Response::builder()
        .status(416)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Range", format!("bytes */{size}"))
        .body(Full::new(Bytes::from("416 Range Not Satisfiable\n")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::from("416 Range Not Satisfiable\n")))
        })
}

/// Build 500 Internal Server Error response
///
/// Opaque on purpose, the cause only goes to the error log.
pub fn build_500_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(500)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from("Internal Server Error\n")))
        .unwrap_or_else(|e| {
            log_build_error("500", &e);
            Response::new(Full::new(Bytes::from("Internal Server Error\n")))
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
