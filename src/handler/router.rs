//! Request dispatch module
//!
//! Entry point for asset requests: method validation, negotiation, then the
//! response writer.

use super::assets::AssetServer;
use super::negotiate::negotiate;
use super::static_files;
use crate::http;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Request, Response};
use std::borrow::Cow;

/// Request fields the asset handler looks at
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    /// Decoded URL path without its leading slash
    pub path: Cow<'a, str>,
    pub is_head: bool,
    /// Raw `Accept-Encoding`, empty when absent
    pub accept_encoding: &'a str,
    pub if_none_match: Option<&'a str>,
    pub range_header: Option<&'a str>,
    pub if_range: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
        let raw_path = req.uri().path();
        let trimmed = raw_path.strip_prefix('/').unwrap_or(raw_path);

        Self {
            method: req.method(),
            path: urlencoding::decode(trimmed).unwrap_or(Cow::Borrowed(trimmed)),
            is_head: req.method() == Method::HEAD,
            accept_encoding: header("accept-encoding").unwrap_or_default(),
            if_none_match: header("if-none-match"),
            range_header: header("range"),
            if_range: header("if-range"),
        }
    }
}

impl AssetServer {
    /// Answer a request
    ///
    /// Failures never escape: every outcome, I/O errors included, ends up
    /// in the returned response.
    pub fn serve<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        if let Some(resp) = check_http_method(req.method()) {
            return resp;
        }

        let ctx = RequestContext::from_request(req);
        match negotiate(&self.index, &self.codecs, &ctx.path, ctx.accept_encoding) {
            Some(resolution) => static_files::write_asset(self, &ctx, &resolution),
            None => http::build_404_response(),
        }
    }

    /// Whether `serve` would find an asset for this request
    ///
    /// Only consults the index, nothing is opened or written, so a caller
    /// can pick another handler (e.g. a single-page app entry) instead.
    pub fn found<B>(&self, req: &Request<B>) -> bool {
        let ctx = RequestContext::from_request(req);
        negotiate(&self.index, &self.codecs, &ctx.path, ctx.accept_encoding).is_some()
    }
}

/// Only GET and HEAD reach the asset handler
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match method {
        &Method::GET | &Method::HEAD => None,
        _ => Some(http::build_405_response()),
    }
}
