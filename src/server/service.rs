// Request service module
// Bridges hyper requests to the blocking asset server

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{HeaderName, CONTENT_ENCODING, REFERER, USER_AGENT};
use hyper::{Request, Response, Uri, Version};

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Serve one request from the shared asset server
///
/// The request body is never read. When a fallback asset is configured and
/// the path does not resolve, the fallback answers instead.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let mut req = Request::from_parts(parts, ());

    let entry = state.access_log_enabled().then(|| access_entry(&req, peer_addr));

    if let Some(fallback) = state.config.assets.fallback.as_deref() {
        if !state.assets.found(&req) {
            rewrite_path(&mut req, fallback);
        }
    }

    let worker_state = Arc::clone(&state);
    let response = match tokio::task::spawn_blocking(move || worker_state.assets.serve(&req)).await
    {
        Ok(resp) => resp,
        Err(e) => {
            logger::log_error(&format!("Asset worker failed: {e}"));
            http::build_500_response()
        }
    };

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn access_entry(req: &Request<()>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

/// Point the request at the fallback asset, query string dropped
fn rewrite_path(req: &mut Request<()>, fallback: &str) {
    let target = format!("/{}", fallback.trim_start_matches('/'));
    match target.parse::<Uri>() {
        Ok(uri) => *req.uri_mut() = uri,
        Err(e) => logger::log_warning(&format!("Invalid fallback path '{fallback}': {e}")),
    }
}
