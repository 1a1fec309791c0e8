//! HTTP response building module
//!
//! Every format writer funnels through [`blob`], so status and header handling
//! is the same whatever the payload.

use std::io;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::{HeaderMap, Response, StatusCode};
use serde::Serialize;

use super::content_type::{
    APPLICATION_JSON, APPLICATION_XML, OCTET_STREAM, TEXT_HTML, TEXT_PLAIN,
};
use super::params::{self, Param};
use crate::logger;

/// Response type produced by every buffered writer
pub type HttpResponse = Response<Full<Bytes>>;

/// Standard XML declaration prepended when the payload lacks one
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Element wrapping XML payloads that have no natural element name
pub const XML_ROOT: &str = "response";

/// Write raw bytes with `Content-Type: application/octet-stream`
///
/// `params` may override the status (default 200) and any header,
/// including `Content-Type`.
///
/// # Examples
/// ```
/// use hyper_render::http::{blob, Param};
/// let resp = blob("raw", &[Param::Status(201), Param::header("X-Foo", "bar")]);
/// assert_eq!(resp.status(), 201);
/// assert_eq!(resp.headers()["x-foo"], "bar");
/// assert_eq!(resp.headers()["content-type"], "application/octet-stream");
/// ```
pub fn blob(data: impl Into<Bytes>, params: &[Param]) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    let status = params::apply(params, &mut headers);

    let mut response = Response::new(Full::new(data.into()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// `blob` whose content type is forced after the caller's params
fn typed_blob(data: impl Into<Bytes>, params: &[Param], content_type: &'static str) -> HttpResponse {
    let mut response = blob(data, params);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Write a string as `text/plain; charset=utf-8`
pub fn plain_text(text: impl Into<String>, params: &[Param]) -> HttpResponse {
    typed_blob(text.into(), params, TEXT_PLAIN)
}

/// Write a string as `text/html; charset=utf-8`
pub fn html(text: impl Into<String>, params: &[Param]) -> HttpResponse {
    typed_blob(text.into(), params, TEXT_HTML)
}

/// Marshal `value` to JSON with HTML escaping, as `application/json`
pub fn json<T: Serialize + ?Sized>(value: &T, params: &[Param]) -> HttpResponse {
    match encode_json(value) {
        Ok(body) => typed_blob(body, params, APPLICATION_JSON),
        Err(e) => {
            logger::log_render_failure("json", 500, &e);
            server_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

/// Marshal `value` to XML, as `application/xml`
///
/// The standard declaration is prepended unless one already appears in the
/// first 100 bytes of the encoded payload.
pub fn xml<T: Serialize + ?Sized>(value: &T, params: &[Param]) -> HttpResponse {
    let encoded = match encode_xml(value) {
        Ok(s) => s,
        Err(e) => {
            logger::log_render_failure("xml", 500, &e);
            return server_error(StatusCode::INTERNAL_SERVER_ERROR, &e);
        }
    };

    let head = &encoded.as_bytes()[..encoded.len().min(100)];
    let body = if contains(head, b"<?xml") {
        encoded
    } else {
        format!("{XML_HEADER}{encoded}")
    };
    typed_blob(body, params, APPLICATION_XML)
}

/// Build 204 No Content response
pub fn no_content() -> HttpResponse {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("204", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build redirect response with the given status
pub fn redirect(target: &str, status: StatusCode) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(LOCATION, target)
        .header(CONTENT_TYPE, TEXT_HTML)
        .body(Full::new(Bytes::from(format!(
            "<a href=\"{}\">{}</a>.\n",
            escape_html(target),
            status.canonical_reason().unwrap_or("Redirect")
        ))))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            server_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        })
}

/// Plain text error response: the message followed by a newline
pub fn server_error(status: StatusCode, message: &str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from(format!("{message}\n"))))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from("Error")))
        })
}

/// JSON encoding with `<`, `>`, `&`, U+2028 and U+2029 escaped, newline terminated
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// XML encoding; values without an element name are wrapped in [`XML_ROOT`]
pub fn encode_xml<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    quick_xml::se::to_string(value).or_else(|_| {
        quick_xml::se::to_string_with_root(XML_ROOT, value).map_err(|e| e.to_string())
    })
}

struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
