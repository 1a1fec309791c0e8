//! Response parameter module
//!
//! An ordered list of [`Param`] values adjusts the status and headers of a
//! rendered response. Order matters:
//! - the first non-zero `Status` wins, later ones are ignored
//! - `Header` pairs are applied immediately, replacing earlier values
//! - `Headers` maps are merged key by key
//! - `Template` is only read by the text and HTML renderers

use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, StatusCode};

use crate::logger;

/// A single response parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// HTTP status code; zero is ignored
    Status(u16),
    /// Header name followed by its value
    Header(String, String),
    /// Header collection merged into the response
    Headers(HeaderMap),
    /// Inline template source, or `tmpl://name` for a registered template
    Template(String),
}

impl Param {
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Header(name.into(), value.into())
    }

    pub fn template(source: impl Into<String>) -> Self {
        Self::Template(source.into())
    }
}

impl From<StatusCode> for Param {
    fn from(status: StatusCode) -> Self {
        Self::Status(status.as_u16())
    }
}

impl From<HeaderMap> for Param {
    fn from(headers: HeaderMap) -> Self {
        Self::Headers(headers)
    }
}

/// Apply `params` to `headers` and return the chosen status (200 if none)
pub fn apply(params: &[Param], headers: &mut HeaderMap) -> StatusCode {
    let mut status: Option<StatusCode> = None;

    for param in params {
        match param {
            Param::Status(0) | Param::Template(_) => {}
            Param::Status(code) => {
                if status.is_none() {
                    match StatusCode::from_u16(*code) {
                        Ok(s) => status = Some(s),
                        Err(e) => logger::log_warning(&format!("ignoring status {code}: {e}")),
                    }
                }
            }
            Param::Header(name, value) => set_header(headers, name, value),
            Param::Headers(map) => merge_headers(headers, map),
        }
    }

    status.unwrap_or(StatusCode::OK)
}

/// First template source among `params`
pub fn template(params: &[Param]) -> Option<&str> {
    params.iter().find_map(|p| match p {
        Param::Template(source) => Some(source.as_str()),
        _ => None,
    })
}

fn set_header(headers: &mut HeaderMap, name: &str, value: &str) {
    let name = match HeaderName::from_bytes(name.as_bytes()) {
        Ok(n) => n,
        Err(e) => return logger::log_skipped_header(name, &e.to_string()),
    };
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(e) => logger::log_skipped_header(name.as_str(), &e.to_string()),
    }
}

/// Each key present in `from` replaces all of that key's values in `into`
pub fn merge_headers(into: &mut HeaderMap, from: &HeaderMap) {
    for name in from.keys() {
        into.remove(name);
        for value in from.get_all(name) {
            into.append(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{CONTENT_TYPE, LINK};

    #[test]
    fn test_default_status() {
        let mut headers = HeaderMap::new();
        assert_eq!(apply(&[], &mut headers), StatusCode::OK);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_first_status_wins() {
        let mut headers = HeaderMap::new();
        let status = apply(
            &[Param::Status(0), Param::Status(201), Param::Status(404)],
            &mut headers,
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    #[test]
    fn test_invalid_status_is_skipped() {
        let mut headers = HeaderMap::new();
        let status = apply(&[Param::Status(1000), Param::Status(202)], &mut headers);
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[test]
    fn test_header_pairs_in_order() {
        let mut headers = HeaderMap::new();
        apply(
            &[
                Param::header("X-Foo", "bar"),
                Param::Status(201),
                Param::header("X-Foo", "baz"),
            ],
            &mut headers,
        );
        assert_eq!(headers.get("x-foo").unwrap(), "baz");
        assert_eq!(headers.get_all("x-foo").iter().count(), 1);
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let mut headers = HeaderMap::new();
        apply(
            &[Param::header("bad header", "v"), Param::header("X-Ok", "v")],
            &mut headers,
        );
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_headers_merge_replaces_keys() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert("x-keep", HeaderValue::from_static("1"));

        let mut extra = HeaderMap::new();
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        extra.append(LINK, HeaderValue::from_static("<a>; rel=\"next\""));
        extra.append(LINK, HeaderValue::from_static("<b>; rel=\"last\""));

        apply(&[Param::Headers(extra)], &mut headers);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get("x-keep").unwrap(), "1");
        assert_eq!(headers.get_all(LINK).iter().count(), 2);
    }

    #[test]
    fn test_template_lookup() {
        let params = [
            Param::Status(200),
            Param::template("{{ name }}"),
            Param::template("ignored"),
        ];
        assert_eq!(template(&params), Some("{{ name }}"));
        assert_eq!(template(&[Param::Status(200)]), None);
    }
}
