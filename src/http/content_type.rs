//! Content type classification module
//!
//! Maps raw MIME strings from `Content-Type` and `Accept` headers onto the
//! closed set of formats the renderer and decoder know about.

use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::HeaderMap;
use serde::{Deserialize, Serialize};

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json; charset=utf-8";
pub const APPLICATION_XML: &str = "application/xml; charset=utf-8";
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
pub const EVENT_STREAM: &str = "text/event-stream; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Formats handled by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Unknown,
    PlainText,
    Html,
    Json,
    Xml,
    Form,
    EventStream,
}

impl ContentType {
    /// Classify a MIME string, ignoring parameters after `;`
    ///
    /// # Examples
    /// ```
    /// use hyper_render::http::ContentType;
    /// assert_eq!(ContentType::classify("application/json; charset=utf-8"), ContentType::Json);
    /// assert_eq!(ContentType::classify("text/xml"), ContentType::Xml);
    /// assert_eq!(ContentType::classify("image/png"), ContentType::Unknown);
    /// ```
    pub fn classify(raw: &str) -> Self {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        match essence {
            "text/plain" => Self::PlainText,
            "text/html" | "application/xhtml+xml" => Self::Html,
            "application/json" | "text/javascript" => Self::Json,
            "text/xml" | "application/xml" => Self::Xml,
            "application/x-www-form-urlencoded" => Self::Form,
            "text/event-stream" => Self::EventStream,
            _ => Self::Unknown,
        }
    }

    /// `Content-Type` header value written for this format
    pub const fn mime(self) -> &'static str {
        match self {
            Self::PlainText => TEXT_PLAIN,
            Self::Html => TEXT_HTML,
            Self::Json => APPLICATION_JSON,
            Self::Xml => APPLICATION_XML,
            Self::Form => APPLICATION_FORM,
            Self::EventStream => EVENT_STREAM,
            Self::Unknown => OCTET_STREAM,
        }
    }
}

/// Classify the request's declared `Content-Type`
pub fn request_content_type(headers: &HeaderMap) -> ContentType {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(ContentType::Unknown, ContentType::classify)
}

/// Classify the first field of the `Accept` header, substituting `default`
/// when it names nothing we recognise
pub fn accepted_content_type(headers: &HeaderMap, default: ContentType) -> ContentType {
    let accepted = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .map_or(ContentType::Unknown, |field| ContentType::classify(field.trim()));

    if accepted == ContentType::Unknown {
        default
    } else {
        accepted
    }
}
