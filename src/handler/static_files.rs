//! Static asset response writer
//!
//! Turns a negotiated representation into a response: conditional check,
//! representation headers, then the body, decoded when required.

use super::assets::AssetServer;
use super::negotiate::Resolution;
use super::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::vfs::AssetReader;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, VARY,
};
use hyper::Response;
use std::io::{self, Cursor, Read};

/// Build the response for a resolved asset
pub fn write_asset(
    server: &AssetServer,
    ctx: &RequestContext<'_>,
    resolution: &Resolution<'_>,
) -> Response<Full<Bytes>> {
    if cache::check_etag_match(ctx.if_none_match, &resolution.etag) {
        return http::build_304_response();
    }

    let mut response = Response::new(Full::new(Bytes::new()));
    set_representation_headers(&mut response, resolution);

    let reader = match open_stored(server, resolution) {
        Ok(r) => r,
        Err(e) => {
            server.on_error.handle_failure(&mut response, ctx, &e);
            return response;
        }
    };

    if resolution.decoder.is_none() {
        response
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(resolution.record.size));
    }

    if ctx.is_head {
        return response;
    }

    let reader = match resolution.decoder {
        Some(decode) => match decode(reader.into_read()) {
            Ok(r) => AssetReader::Stream(r),
            Err(e) => {
                // The validator described the decoded body that will not be sent
                response.headers_mut().remove(ETAG);
                server.on_error.handle_failure(&mut response, ctx, &e);
                return response;
            }
        },
        None => reader,
    };

    let outcome = match reader {
        AssetReader::Seekable(mut r) => {
            http::serve_content(&mut response, r.as_mut(), ctx.range_header, ctx.if_range)
        }
        AssetReader::Stream(mut r) => copy_body(&mut response, &mut r),
    };
    if let Err(e) = outcome {
        server.on_error.handle_failure(&mut response, ctx, &e);
    }

    response
}

fn set_representation_headers(response: &mut Response<Full<Bytes>>, resolution: &Resolution<'_>) {
    let headers = response.headers_mut();

    // Type comes from the logical path, compressed bytes are never sniffed
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(mime::content_type_for(resolution.path)),
    );
    if let Ok(v) = HeaderValue::from_str(&resolution.etag) {
        headers.insert(ETAG, v);
    }
    if !resolution.encoding.is_empty() {
        if let Ok(v) = HeaderValue::from_str(resolution.encoding) {
            headers.insert(CONTENT_ENCODING, v);
        }
    }
    if resolution.varies {
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
}

/// Open the stored bytes, in-memory sidecars first
fn open_stored(server: &AssetServer, resolution: &Resolution<'_>) -> io::Result<AssetReader> {
    match &resolution.record.content {
        Some(content) => Ok(AssetReader::Seekable(Box::new(Cursor::new(content.clone())))),
        None => server.fs.open(&resolution.stored_path()),
    }
}

fn copy_body(response: &mut Response<Full<Bytes>>, reader: &mut dyn Read) -> io::Result<()> {
    let mut body = Vec::new();
    reader.read_to_end(&mut body)?;
    *response.body_mut() = Full::new(Bytes::from(body));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::codec::Codec;
    use crate::handler::{AssetServer, RequestContext};
    use crate::http::cache;
    use crate::vfs::{AssetEntry, AssetFs, AssetReader, MemFs};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::{Method, Request, Response};
    use std::io::{self, Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn get(uri: &str, headers: &[(&str, &str)]) -> Request<()> {
        request(Method::GET, uri, headers)
    }

    async fn body_bytes(res: Response<Full<Bytes>>) -> Vec<u8> {
        res.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    fn header<'a>(res: &'a Response<Full<Bytes>>, name: &str) -> Option<&'a str> {
        res.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn sample_fs() -> MemFs {
        MemFs::new()
            .with_file("a.txt", "hello")
            .with_file("a.txt.gz", gzip(b"hello"))
            .with_file("b.bin.gz", gzip(b"binary payload \x00\x01\x02"))
            .with_file("logo.png", vec![0x89, b'P', b'N', b'G'])
            .with_file("bad.png.gz", "definitely not gzip")
    }

    fn server() -> AssetServer {
        AssetServer::new(sample_fs()).unwrap()
    }

    #[tokio::test]
    async fn test_compressed_sidecar_verbatim() {
        let server = server();
        let res = server.serve(&get("/a.txt", &[("Accept-Encoding", "gzip")]));

        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Encoding"), Some("gzip"));
        assert_eq!(header(&res, "Vary"), Some("Accept-Encoding"));
        assert_eq!(header(&res, "Content-Type"), Some("text/plain; charset=utf-8"));
        let expected_etag = cache::generate_etag(&gzip(b"hello"));
        assert_eq!(header(&res, "ETag"), Some(expected_etag.as_str()));
        assert_eq!(body_bytes(res).await, gzip(b"hello"));
    }

    #[tokio::test]
    async fn test_native_without_accept_encoding() {
        let server = server();
        let res = server.serve(&get("/a.txt", &[]));

        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Encoding"), None);
        assert_eq!(header(&res, "Content-Length"), Some("5"));
        let expected_etag = cache::generate_etag(b"hello");
        assert_eq!(header(&res, "ETag"), Some(expected_etag.as_str()));
        assert_eq!(body_bytes(res).await, b"hello");
    }

    #[tokio::test]
    async fn test_decompress_when_not_accepted() {
        let server = server();
        let res = server.serve(&get("/b.bin", &[("Accept-Encoding", "identity")]));

        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Encoding"), None);
        assert_eq!(header(&res, "Content-Length"), None);
        assert_eq!(header(&res, "Content-Type"), Some("application/octet-stream"));
        let stored = gzip(b"binary payload \x00\x01\x02");
        let expected_etag = format!("{}U", cache::generate_etag(&stored));
        assert_eq!(header(&res, "ETag"), Some(expected_etag.as_str()));

        let body = body_bytes(res).await;
        assert_eq!(body, b"binary payload \x00\x01\x02");
        // Compressing the body again gives back the stored sidecar
        assert_eq!(gzip(&body), stored);
    }

    #[tokio::test]
    async fn test_conditional_request_not_modified() {
        let server = server();
        let first = server.serve(&get("/a.txt", &[("Accept-Encoding", "gzip")]));
        let etag = header(&first, "ETag").unwrap().to_string();

        let res = server.serve(&get(
            "/a.txt",
            &[("Accept-Encoding", "gzip"), ("If-None-Match", &etag)],
        ));
        assert_eq!(res.status(), 304);
        assert!(res.headers().get("ETag").is_none());
        assert!(res.headers().get("Content-Encoding").is_none());
        assert!(body_bytes(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_validator_depends_on_representation() {
        let server = server();
        let compressed = server.serve(&get("/a.txt", &[("Accept-Encoding", "gzip")]));
        let etag = header(&compressed, "ETag").unwrap().to_string();

        // The compressed validator does not match the raw representation
        let res = server.serve(&get("/a.txt", &[("If-None-Match", &etag)]));
        assert_eq!(res.status(), 200);
        assert_eq!(body_bytes(res).await, b"hello");
    }

    #[tokio::test]
    async fn test_head_matches_get_headers() {
        let server = server();
        let cases: [(&str, &[(&str, &str)]); 3] = [
            ("/a.txt", &[("Accept-Encoding", "gzip")]),
            ("/a.txt", &[]),
            ("/b.bin", &[]),
        ];

        for (uri, headers) in cases {
            let get_res = server.serve(&request(Method::GET, uri, headers));
            let head_res = server.serve(&request(Method::HEAD, uri, headers));

            assert_eq!(head_res.status(), get_res.status());
            for name in ["Content-Encoding", "ETag", "Content-Type", "Vary"] {
                assert_eq!(header(&head_res, name), header(&get_res, name), "{uri} {name}");
            }
            assert!(body_bytes(head_res).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_head_keeps_content_length() {
        let server = server();
        let res = server.serve(&request(Method::HEAD, "/a.txt", &[]));
        assert_eq!(header(&res, "Content-Length"), Some("5"));
        assert!(body_bytes(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let server = server();
        let res = server.serve(&request(Method::DELETE, "/a.txt", &[]));

        assert_eq!(res.status(), 405);
        assert_eq!(header(&res, "Allow"), Some("GET, HEAD"));
        assert_eq!(
            body_bytes(res).await,
            b"Method Not Allowed\n\nmethod should be GET or HEAD\n"
        );
    }

    #[test]
    fn test_not_found() {
        let server = server();
        let req = get("/missing.txt", &[("Accept-Encoding", "gzip")]);
        assert_eq!(server.serve(&req).status(), 404);
        assert!(!server.found(&req));
    }

    #[test]
    fn test_found_predicate() {
        let server = server();
        assert!(server.found(&get("/a.txt", &[])));
        assert!(server.found(&get("/b.bin", &[])));
        assert!(server.found(&get("/a.txt.gz", &[])));
        // Paths must match exactly, no directory index lookup
        assert!(!server.found(&get("/", &[])));
        assert!(!server.found(&get("/a.txt/", &[])));
    }

    #[tokio::test]
    async fn test_range_on_native_file() {
        let server = server();
        let res = server.serve(&get("/a.txt", &[("Range", "bytes=1-3")]));

        assert_eq!(res.status(), 206);
        assert_eq!(header(&res, "Content-Range"), Some("bytes 1-3/5"));
        assert_eq!(header(&res, "Content-Length"), Some("3"));
        assert_eq!(body_bytes(res).await, b"ell");
    }

    #[tokio::test]
    async fn test_range_ignored_on_decoded_stream() {
        let server = server();
        let res = server.serve(&get("/b.bin", &[("Range", "bytes=0-3")]));

        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Range"), None);
        assert_eq!(body_bytes(res).await, b"binary payload \x00\x01\x02");
    }

    #[tokio::test]
    async fn test_decode_error_default_hook() {
        let server = server();
        let res = server.serve(&get("/bad.png", &[]));

        assert_eq!(res.status(), 500);
        assert!(res.headers().get("ETag").is_none());
        assert!(res.headers().get("Content-Encoding").is_none());
        assert_eq!(body_bytes(res).await, b"Internal Server Error\n");
    }

    #[tokio::test]
    async fn test_decode_error_custom_hook() {
        let server = AssetServer::builder(sample_fs())
            .with_brotli()
            .on_error(
                |res: &mut Response<Full<Bytes>>, req: &RequestContext<'_>, err: &io::Error| {
                    assert_eq!(req.path, "bad.png");
                    assert_eq!(err.to_string(), "gzip: invalid header");
                    *res.body_mut() = Full::new(Bytes::from("failed"));
                },
            )
            .build()
            .unwrap();

        let res = server.serve(&get("/bad.png", &[]));
        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Encoding"), None);
        assert_eq!(header(&res, "ETag"), None);
        assert_eq!(body_bytes(res).await, b"failed");
    }

    #[test]
    fn test_head_skips_decoder() {
        let server = server();
        let res = server.serve(&request(Method::HEAD, "/bad.png", &[]));

        assert_eq!(res.status(), 200);
        assert!(res.headers().get("ETag").is_some());
    }

    /// Valid gzip header, deflate stream cut in the middle
    fn truncated_gzip() -> Vec<u8> {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let mut compressed = gzip(&payload);
        compressed.truncate(compressed.len() / 2);
        compressed
    }

    #[tokio::test]
    async fn test_copy_error_default_hook() {
        let fs = MemFs::new().with_file("t.js.gz", truncated_gzip());
        let server = AssetServer::new(fs).unwrap();

        let res = server.serve(&get("/t.js", &[]));
        assert_eq!(res.status(), 500);
        assert!(res.headers().get("ETag").is_none());
        assert_eq!(body_bytes(res).await, b"Internal Server Error\n");
    }

    #[tokio::test]
    async fn test_copy_error_custom_hook() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None::<String>));
        let recorder = std::sync::Arc::clone(&seen);
        let fs = MemFs::new().with_file("t.js.gz", truncated_gzip());
        let server = AssetServer::builder(fs)
            .on_error(
                move |res: &mut Response<Full<Bytes>>, req: &RequestContext<'_>, err: &io::Error| {
                    assert_eq!(req.path, "t.js");
                    *recorder.lock().unwrap() = Some(err.to_string());
                    *res.body_mut() = Full::new(Bytes::from("failed"));
                },
            )
            .build()
            .unwrap();

        let res = server.serve(&get("/t.js", &[]));
        assert_eq!(res.status(), 200);
        // Header checks passed, only reading the stream failed
        assert!(res.headers().get("ETag").is_some());
        assert_eq!(body_bytes(res).await, b"failed");

        let message = seen.lock().unwrap().clone().expect("hook was not called");
        assert_ne!(message, "gzip: invalid header");
    }

    /// Indexes fine, then refuses to reopen anything
    struct VanishingFs {
        inner: MemFs,
        opened: std::sync::atomic::AtomicUsize,
    }

    impl AssetFs for VanishingFs {
        fn read_dir(&self, path: &str) -> io::Result<Vec<AssetEntry>> {
            self.inner.read_dir(path)
        }

        fn open(&self, path: &str) -> io::Result<AssetReader> {
            let n = self
                .opened
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                self.inner.open(path)
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
            }
        }
    }

    #[test]
    fn test_open_error_goes_to_hook() {
        let fs = VanishingFs {
            inner: MemFs::new().with_file("a.txt", "hello"),
            opened: std::sync::atomic::AtomicUsize::new(0),
        };
        let server = AssetServer::new(fs).unwrap();

        let res = server.serve(&get("/a.txt", &[]));
        assert_eq!(res.status(), 500);
    }

    #[test]
    fn test_not_modified_skips_io() {
        let fs = VanishingFs {
            inner: MemFs::new().with_file("a.txt", "hello"),
            opened: std::sync::atomic::AtomicUsize::new(0),
        };
        let server = AssetServer::new(fs).unwrap();
        let etag = cache::generate_etag(b"hello");

        let res = server.serve(&get("/a.txt", &[("If-None-Match", &etag)]));
        assert_eq!(res.status(), 304);
    }

    #[tokio::test]
    async fn test_encode_on_init_serves_synthetic_sidecars() {
        let fs = MemFs::new().with_file("swagger.json", "{\"openapi\":\"3.0.0\"}");
        let server = AssetServer::builder(fs)
            .with_brotli()
            .encode_on_init(true)
            .build()
            .unwrap();
        let raw_etag = cache::generate_etag(b"{\"openapi\":\"3.0.0\"}");

        let res = server.serve(&get("/swagger.json", &[("Accept-Encoding", "gzip, br")]));
        assert_eq!(header(&res, "Content-Encoding"), Some("br"));
        let expected = format!("{raw_etag}.br");
        assert_eq!(header(&res, "ETag"), Some(expected.as_str()));

        let res = server.serve(&get("/swagger.json", &[("Accept-Encoding", "gzip")]));
        assert_eq!(header(&res, "Content-Encoding"), Some("gzip"));
        let expected = format!("{raw_etag}.gz");
        assert_eq!(header(&res, "ETag"), Some(expected.as_str()));
        assert_eq!(gunzip(&body_bytes(res).await), b"{\"openapi\":\"3.0.0\"}");
    }

    #[tokio::test]
    async fn test_brotli_preferred_when_prepended() {
        let raw = b"body { color: red; }".repeat(10);
        let br = (Codec::brotli().encoder.unwrap())(&mut raw.as_slice()).unwrap();
        let fs = MemFs::new()
            .with_file("site.css.br", br.clone())
            .with_file("site.css.gz", gzip(&raw));
        let server = AssetServer::builder(fs).with_brotli().build().unwrap();

        let res = server.serve(&get("/site.css", &[("Accept-Encoding", "gzip, br")]));
        assert_eq!(header(&res, "Content-Encoding"), Some("br"));
        assert_eq!(body_bytes(res).await, br);

        // No encoding accepted and no original: first decodable codec wins
        let res = server.serve(&get("/site.css", &[]));
        assert_eq!(header(&res, "Content-Encoding"), None);
        assert_eq!(body_bytes(res).await, raw);
    }

    #[tokio::test]
    async fn test_serves_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("deeper")).unwrap();
        std::fs::write(tmp.path().join("deeper/openapi.json.gz"), gzip(b"{}")).unwrap();

        let server = AssetServer::new(crate::vfs::DirFs::new(tmp.path())).unwrap();
        let res = server.serve(&get("/deeper/openapi.json", &[]));
        assert_eq!(res.status(), 200);
        assert_eq!(header(&res, "Content-Type"), Some("application/json"));
        assert_eq!(body_bytes(res).await, b"{}");
    }
}
