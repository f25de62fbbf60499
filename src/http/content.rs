//! Seekable content serving
//!
//! Fills a prepared response from a seekable stream, answering a single
//! byte range when the request carries one. The response already holds the
//! representation headers (`Content-Type`, `ETag`, `Content-Encoding`).
//! No `Last-Modified` is emitted: assets carry no modification time.

use super::range::{if_range_matches, parse_range_header, RangeParseResult};
use super::response::build_416_response;
use crate::vfs::ReadSeek;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, ETAG};
use hyper::{Response, StatusCode};
use std::io::{self, Read, SeekFrom};

/// Write the full content or the requested range into `res`
///
/// I/O errors are returned untouched, `res` is then left without a body.
pub fn serve_content(
    res: &mut Response<Full<Bytes>>,
    reader: &mut dyn ReadSeek,
    range_header: Option<&str>,
    if_range: Option<&str>,
) -> io::Result<()> {
    let size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let etag = res
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let range = if if_range_matches(if_range, etag) {
        parse_range_header(range_header, size)
    } else {
        RangeParseResult::None
    };

    let headers = res.headers_mut();
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match range {
        RangeParseResult::Valid(r) => {
            reader.seek(SeekFrom::Start(r.start))?;
            let body = read_exact_len(reader, r.len())?;

            if let Ok(v) = HeaderValue::from_str(&r.content_range(size)) {
                headers.insert(CONTENT_RANGE, v);
            }
            headers.insert(CONTENT_LENGTH, HeaderValue::from(r.len()));
            *res.status_mut() = StatusCode::PARTIAL_CONTENT;
            *res.body_mut() = Full::new(Bytes::from(body));
        }
        RangeParseResult::NotSatisfiable => {
            *res = build_416_response(size);
        }
        RangeParseResult::None => {
            let body = read_exact_len(reader, size)?;
            headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
            *res.body_mut() = Full::new(Bytes::from(body));
        }
    }

    Ok(())
}

fn read_exact_len(reader: &mut dyn ReadSeek, len: u64) -> io::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    reader.take(len).read_to_end(&mut body)?;
    if (body.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "content shorter than its declared size",
        ));
    }
    Ok(body)
}
