//! File response module
//!
//! Serves a file from disk as `application/octet-stream` with a
//! `Content-Disposition` header, honouring `If-None-Match` and single byte
//! ranges.

use std::io;
use std::path::Path;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_NONE_MATCH, RANGE,
};
use hyper::{Method, Request, Response, StatusCode};
use tokio::fs;

use super::cache;
use super::content_type::OCTET_STREAM;
use super::range::{parse_range, ByteRange};
use super::response::{server_error, HttpResponse};
use crate::logger;

/// Send the file as a download named after its path
pub async fn file<B>(req: &Request<B>, path: impl AsRef<Path>) -> HttpResponse {
    let path = path.as_ref();
    let disposition = format!("attachment; filename={:?}", path.display().to_string());
    serve(req, path, &disposition).await
}

/// Send the file as an attachment, prompting the client to save it
pub async fn attachment<B>(req: &Request<B>, path: impl AsRef<Path>) -> HttpResponse {
    serve(req, path.as_ref(), "attachment").await
}

/// Send the file inline, for display in the browser
pub async fn inline<B>(req: &Request<B>, path: impl AsRef<Path>) -> HttpResponse {
    serve(req, path.as_ref(), "inline").await
}

async fn serve<B>(req: &Request<B>, path: &Path, disposition: &str) -> HttpResponse {
    let data = match fs::read(path).await {
        Ok(d) => d,
        Err(e) => return read_failure(path, &e),
    };

    let header = |name| req.headers().get(name).and_then(|v| v.to_str().ok());
    let etag = cache::generate_etag(&data);
    let total = data.len();
    let is_head = req.method() == Method::HEAD;

    let builder = Response::builder()
        .header(CONTENT_DISPOSITION, disposition)
        .header(CONTENT_TYPE, OCTET_STREAM)
        .header(ETAG, &etag)
        .header(ACCEPT_RANGES, "bytes");

    if cache::is_fresh(header(IF_NONE_MATCH), &etag) {
        return finish(builder.status(StatusCode::NOT_MODIFIED), Bytes::new());
    }

    let (builder, body) = match parse_range(header(RANGE), total) {
        ByteRange::Full => (builder.status(StatusCode::OK), Bytes::from(data)),
        ByteRange::Partial(span) => {
            let (start, end) = (*span.start(), *span.end());
            let builder = builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_RANGE, format!("bytes {start}-{end}/{total}"));
            (builder, Bytes::from(data).slice(span))
        }
        ByteRange::Unsatisfiable => {
            let builder = builder
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(CONTENT_RANGE, format!("bytes */{total}"));
            (builder, Bytes::new())
        }
    };

    finish(builder, if is_head { Bytes::new() } else { body })
}

fn finish(builder: hyper::http::response::Builder, body: Bytes) -> HttpResponse {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build file response: {e}"));
        server_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
    })
}

fn read_failure(path: &Path, err: &io::Error) -> HttpResponse {
    match err.kind() {
        io::ErrorKind::NotFound => server_error(StatusCode::NOT_FOUND, "404 page not found"),
        io::ErrorKind::PermissionDenied => server_error(StatusCode::FORBIDDEN, "403 Forbidden"),
        _ => {
            logger::log_error(&format!("Failed to read file '{}': {err}", path.display()));
            server_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "500 Internal Server Error",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn temp_file(name: &str, contents: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("hyper-render-file-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn get(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/download");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap()
    }

    async fn body_bytes(resp: HttpResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_file_sets_disposition_with_name() {
        let path = temp_file("report.txt", b"hello file");
        let resp = file(&get(&[]), &path).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], OCTET_STREAM);
        let disposition = resp.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.ends_with("report.txt\""));
        assert_eq!(body_bytes(resp).await, Bytes::from_static(b"hello file"));
    }

    #[tokio::test]
    async fn test_attachment_and_inline() {
        let path = temp_file("inline.txt", b"abc");
        let resp = attachment(&get(&[]), &path).await;
        assert_eq!(resp.headers()[CONTENT_DISPOSITION], "attachment");
        let resp = inline(&get(&[]), &path).await;
        assert_eq!(resp.headers()[CONTENT_DISPOSITION], "inline");
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let resp = attachment(&get(&[]), "/definitely/not/here.bin").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_range_and_etag() {
        let path = temp_file("range.bin", b"0123456789");
        let resp = inline(&get(&[("range", "bytes=2-4")]), &path).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 2-4/10");
        let etag = resp.headers()[ETAG].to_str().unwrap().to_string();
        assert_eq!(body_bytes(resp).await, Bytes::from_static(b"234"));

        let resp = inline(&get(&[("if-none-match", etag.as_str())]), &path).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        let resp = inline(&get(&[("range", "bytes=50-")]), &path).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()[CONTENT_RANGE], "bytes */10");
    }
}
