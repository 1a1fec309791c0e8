//! Pagination module
//!
//! Reads `page` / `per_page` from the query string, computes navigation
//! state against a total item count and renders it as response headers
//! (`x-page`, `Link`, ...) or as a body envelope around the items.
//!
//! Out-of-range requests (page 0, per-page 0, page past the end) are answered
//! with a 301 to the corrected URL instead of being rendered.

use hyper::header::{HeaderName, HeaderValue, LINK};
use hyper::{HeaderMap, Request, StatusCode, Uri};
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;
use crate::http::query::{parse_query, rewrite_query};
use crate::http::response::{redirect, server_error, HttpResponse};
use crate::http::Param;
use crate::logger;
use crate::render::Render;

/// Builds pagination response headers
pub type PaginationHeaderFn = Box<dyn Fn(&Pagination) -> HeaderMap + Send + Sync>;

/// Wraps the serialized items into the paginated response body
pub type PaginationBodyFn =
    Box<dyn Fn(&Pagination, serde_json::Value) -> serde_json::Value + Send + Sync>;

/// Page state for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    uri: Option<Uri>,
    page: u64,
    per_page: u64,
    total: u64,
    last: u64,
    page_param: String,
    per_page_param: String,
    per_page_default: u64,
}

/// Default pagination body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prev: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last: String,
    pub items: T,
}

/// Number of pages for `total` items, never less than 1
///
/// # Examples
/// ```
/// use hyper_render::pagination::total_pages;
/// assert_eq!(total_pages(25, 100), 4);
/// assert_eq!(total_pages(25, 101), 5);
/// assert_eq!(total_pages(25, 0), 1);
/// ```
pub fn total_pages(per_page: u64, total: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page).max(1)
}

impl Pagination {
    /// Pagination for the request URI
    pub fn from_request<B>(req: &Request<B>, total: u64, config: &PaginationConfig) -> Self {
        Self::from_uri(req.uri().clone(), total, config)
    }

    /// Pagination for `uri`; absent or invalid values fall back to page 1 and
    /// the configured per-page default
    pub fn from_uri(uri: Uri, total: u64, config: &PaginationConfig) -> Self {
        let query = parse_query(uri.query().unwrap_or_default());
        let number = |name: &str| {
            query
                .get(name)
                .and_then(|values| values.first())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        let page = number(config.page_param.as_str()).unwrap_or(1);
        let per_page = number(config.per_page_param.as_str()).unwrap_or(config.per_page_default);

        Self {
            uri: Some(uri),
            page,
            per_page,
            total,
            last: total_pages(per_page, total),
            page_param: config.page_param.clone(),
            per_page_param: config.per_page_param.clone(),
            per_page_default: config.per_page_default,
        }
    }

    /// Override the per-page value parsed from the query
    #[must_use]
    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self.last = total_pages(self.per_page, self.total);
        self
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        self.last = total_pages(self.per_page, self.total);
    }

    pub const fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    pub const fn page(&self) -> u64 {
        self.page
    }

    pub const fn per_page(&self) -> u64 {
        self.per_page
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    pub const fn last(&self) -> u64 {
        self.last
    }

    pub fn next(&self) -> u64 {
        self.page.saturating_add(1).min(self.last)
    }

    pub fn prev(&self) -> u64 {
        self.page.saturating_sub(1).max(1)
    }

    /// URL of the next page, empty on the last page
    pub fn next_url(&self) -> String {
        if self.page == self.last {
            return String::new();
        }
        self.page_url(self.next())
    }

    /// URL of the previous page, empty on the first page
    pub fn prev_url(&self) -> String {
        if self.page <= 1 {
            return String::new();
        }
        self.page_url(self.prev())
    }

    pub fn last_url(&self) -> String {
        self.page_url(self.last)
    }

    /// Captured URL with `page` and `per_page` overwritten, empty without a URL
    pub fn page_url(&self, page: u64) -> String {
        let Some(uri) = &self.uri else {
            return String::new();
        };
        rewrite_query(&uri.to_string(), |query| {
            query.insert(self.page_param.clone(), vec![page.to_string()]);
            query.insert(self.per_page_param.clone(), vec![self.per_page.to_string()]);
        })
    }

    /// Whether the current values must be corrected before rendering
    pub const fn should_redirect(&self) -> bool {
        self.page == 0 || self.per_page == 0 || self.page > self.last
    }

    /// Copy with per-page defaulted and the page clamped into `[1, last]`
    #[must_use]
    pub fn corrected(&self) -> Self {
        let mut fixed = self.clone();
        if fixed.per_page == 0 {
            fixed.per_page = fixed.per_page_default.max(1);
        }
        fixed.last = total_pages(fixed.per_page, fixed.total);
        fixed.page = fixed.page.clamp(1, fixed.last);
        fixed
    }

    /// Render `value` with pagination metadata, or redirect to the corrected page
    pub fn render<T, B>(
        &self,
        render: &Render,
        req: &Request<B>,
        value: &T,
        params: &[Param],
    ) -> HttpResponse
    where
        T: Serialize + ?Sized,
    {
        if self.should_redirect() {
            let mut fixed = self.corrected();
            fixed.uri = Some(req.uri().clone());
            let target = fixed.page_url(fixed.page);
            logger::log_redirect(&req.uri().to_string(), &target);
            return redirect(&target, StatusCode::MOVED_PERMANENTLY);
        }

        if render.config().pagination.in_header {
            let mut all = Vec::with_capacity(params.len() + 1);
            all.push(Param::Headers(render.pagination_headers(self)));
            all.extend_from_slice(params);
            return render.respond(req, value, &all);
        }

        match serde_json::to_value(value) {
            Ok(items) => render.respond(req, &render.pagination_body(self, items), params),
            Err(e) => {
                logger::log_render_failure("pagination body", 500, &e);
                server_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
            }
        }
    }
}

/// `x-page`, `x-per-page`, `x-total`, `x-total-pages`, next/prev counters
/// and `Link` headers
pub fn default_headers(p: &Pagination) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut set = |name: &'static str, value: u64| {
        headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
    };

    set("x-page", p.page());
    set("x-per-page", p.per_page());
    set("x-total", p.total());
    set("x-total-pages", p.last());
    if p.page() != p.last() {
        set("x-next-page", p.next());
    }
    if p.page() > 1 {
        set("x-prev-page", p.prev());
    }

    append_link(&mut headers, &p.next_url(), "next");
    append_link(&mut headers, &p.prev_url(), "prev");
    append_link(&mut headers, &p.last_url(), "last");
    headers
}

fn append_link(headers: &mut HeaderMap, url: &str, rel: &str) {
    if url.is_empty() {
        return;
    }
    match HeaderValue::from_str(&format!("<{url}>; rel=\"{rel}\"")) {
        Ok(value) => {
            headers.append(LINK, value);
        }
        Err(e) => logger::log_skipped_header("link", &e.to_string()),
    }
}

/// [`PageEnvelope`] around `items`
pub fn default_body(p: &Pagination, items: serde_json::Value) -> serde_json::Value {
    let envelope = PageEnvelope {
        page: p.page(),
        per_page: p.per_page(),
        total: p.total(),
        next: p.next_url(),
        prev: p.prev_url(),
        last: p.last_url(),
        items,
    };
    serde_json::to_value(envelope).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build pagination body: {e}"));
        serde_json::Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use http_body_util::BodyExt;
    use hyper::header::LOCATION;

    fn config() -> PaginationConfig {
        PaginationConfig::default()
    }

    fn paged(uri: &str, total: u64) -> Pagination {
        Pagination::from_uri(uri.parse().unwrap(), total, &config())
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header("accept", "application/json")
            .body(())
            .unwrap()
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(25, 100), 4);
        assert_eq!(total_pages(20, 60), 3);
        assert_eq!(total_pages(25, 0), 1);
        assert_eq!(total_pages(0, 100), 1);
        assert_eq!(total_pages(10, 1), 1);
    }

    #[test]
    fn test_defaults_when_absent_or_invalid() {
        let p = paged("/users", 100);
        assert_eq!((p.page(), p.per_page(), p.last()), (1, 25, 4));

        let p = paged("/users?page=abc&per_page=-5", 100);
        assert_eq!((p.page(), p.per_page()), (1, 25));

        let p = paged("/users?page=-2", 100);
        assert_eq!(p.page(), 1);
    }

    #[test]
    fn test_custom_param_names() {
        let cfg = PaginationConfig {
            page_param: "p".to_string(),
            per_page_param: "size".to_string(),
            ..PaginationConfig::default()
        };
        let p = Pagination::from_uri("/items?p=2&size=10".parse().unwrap(), 35, &cfg);
        assert_eq!((p.page(), p.per_page(), p.last()), (2, 10, 4));
        assert_eq!(p.next_url(), "/items?p=3&size=10");
    }

    #[test]
    fn test_next_prev() {
        let p = paged("/users?page=2&per_page=20", 100);
        assert_eq!((p.next(), p.prev(), p.last()), (3, 1, 5));

        let first = paged("/users?page=1&per_page=20", 100);
        assert_eq!(first.prev(), 1);
        assert_eq!(first.prev_url(), "");

        let last = paged("/users?page=5&per_page=20", 100);
        assert_eq!(last.next(), 5);
        assert_eq!(last.next_url(), "");
    }

    #[test]
    fn test_urls_keep_other_params_sorted() {
        let p = paged("http://localhost/users?sort=name&page=2&per_page=10&filter=x", 50);
        assert_eq!(
            p.next_url(),
            "http://localhost/users?filter=x&page=3&per_page=10&sort=name"
        );
        assert_eq!(
            p.prev_url(),
            "http://localhost/users?filter=x&page=1&per_page=10&sort=name"
        );
        assert_eq!(
            p.last_url(),
            "http://localhost/users?filter=x&page=5&per_page=10&sort=name"
        );
    }

    #[test]
    fn test_no_uri_gives_empty_urls() {
        let mut p = paged("/users?page=2", 100);
        p.uri = None;
        assert_eq!(p.next_url(), "");
        assert_eq!(p.prev_url(), "");
        assert_eq!(p.last_url(), "");
    }

    #[test]
    fn test_with_per_page_and_set_total() {
        let mut p = paged("/users", 100).with_per_page(10);
        assert_eq!(p.last(), 10);
        p.set_total(0);
        assert_eq!(p.last(), 1);
        let p = paged("/users", 100).with_per_page(0);
        assert_eq!(p.last(), 1);
        assert!(p.should_redirect());
    }

    #[test]
    fn test_should_redirect() {
        assert!(paged("/users?page=0", 100).should_redirect());
        assert!(paged("/users?per_page=0", 100).should_redirect());
        assert!(paged("/users?page=5&per_page=20", 60).should_redirect());
        assert!(!paged("/users?page=3&per_page=20", 60).should_redirect());
    }

    #[test]
    fn test_corrected() {
        let p = paged("/users?page=5&per_page=0", 100).corrected();
        assert_eq!((p.page(), p.per_page(), p.last()), (4, 25, 4));
        let p = paged("/users?page=0", 100).corrected();
        assert_eq!(p.page(), 1);
    }

    #[test]
    fn test_render_redirects_past_last_page() {
        let render = Render::default();
        let req = get("/users?page=5&per_page=20");
        let p = Pagination::from_request(&req, 60, &render.config().pagination);
        let resp = p.render(&render, &req, &Vec::<u32>::new(), &[]);
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/users?page=3&per_page=20");
    }

    #[test]
    fn test_render_redirects_page_zero() {
        let render = Render::default();
        let req = get("/users?page=0&q=rust");
        let p = Pagination::from_request(&req, 60, &render.config().pagination);
        let resp = p.render(&render, &req, &Vec::<u32>::new(), &[]);
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/users?page=1&per_page=25&q=rust");
    }

    #[test]
    fn test_render_redirects_zero_per_page() {
        let render = Render::default();
        let req = get("/users?page=2&per_page=0");
        let p = Pagination::from_request(&req, 100, &render.config().pagination);
        assert!(p.should_redirect());
        let resp = p.render(&render, &req, &Vec::<u32>::new(), &[]);
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[LOCATION], "/users?page=2&per_page=25");
    }

    #[test]
    fn test_next_saturates_on_huge_page() {
        let p = paged("/users?page=18446744073709551615", 10);
        assert_eq!(p.page(), u64::MAX);
        assert_eq!(p.next(), 1);
        assert!(p.should_redirect());
    }

    #[test]
    fn test_render_headers_for_event_stream_client() {
        let render = Render::default();
        let req = Request::builder()
            .uri("/users?page=1&per_page=20")
            .header("accept", "text/event-stream")
            .body(())
            .unwrap();
        let p = Pagination::from_request(&req, 100, &render.config().pagination);
        let resp = p.render(&render, &req, &vec![1, 2], &[]);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-page"], "1");
        assert_eq!(resp.headers()["x-total-pages"], "5");
        assert_eq!(resp.headers().get_all(LINK).iter().count(), 2);
    }

    #[tokio::test]
    async fn test_render_headers_first_page() {
        let render = Render::default();
        let req = get("/users?page=1&per_page=20");
        let p = Pagination::from_request(&req, 100, &render.config().pagination);
        let resp = p.render(&render, &req, &vec![1, 2, 3], &[Param::Status(200)]);

        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h["x-page"], "1");
        assert_eq!(h["x-per-page"], "20");
        assert_eq!(h["x-next-page"], "2");
        assert_eq!(h["x-total"], "100");
        assert_eq!(h["x-total-pages"], "5");
        assert!(h.get("x-prev-page").is_none());

        let links: Vec<_> = h.get_all(LINK).iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(
            links,
            vec![
                "</users?page=2&per_page=20>; rel=\"next\"",
                "</users?page=5&per_page=20>; rel=\"last\"",
            ]
        );

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"[1,2,3]\n");
    }

    #[test]
    fn test_render_headers_middle_and_last_page() {
        let render = Render::default();
        let req = get("/users?page=3&per_page=20");
        let p = Pagination::from_request(&req, 100, &render.config().pagination);
        let resp = p.render(&render, &req, &Vec::<u32>::new(), &[]);
        assert_eq!(resp.headers()["x-prev-page"], "2");
        assert_eq!(resp.headers()["x-next-page"], "4");
        assert_eq!(resp.headers().get_all(LINK).iter().count(), 3);

        let req = get("/users?page=5&per_page=20");
        let p = Pagination::from_request(&req, 100, &render.config().pagination);
        let resp = p.render(&render, &req, &Vec::<u32>::new(), &[]);
        assert!(resp.headers().get("x-next-page").is_none());
        assert_eq!(resp.headers()["x-prev-page"], "4");
        assert_eq!(resp.headers().get_all(LINK).iter().count(), 2);
    }

    #[tokio::test]
    async fn test_render_body_envelope() {
        let mut config = RenderConfig::default();
        config.pagination.in_header = false;
        let render = Render::new(config);

        let req = get("/users?page=2&per_page=2");
        let p = Pagination::from_request(&req, 5, &render.config().pagination);
        let resp = p.render(&render, &req, &vec!["c", "d"], &[]);
        assert!(resp.headers().get("x-page").is_none());

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let envelope: PageEnvelope<Vec<String>> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            envelope,
            PageEnvelope {
                page: 2,
                per_page: 2,
                total: 5,
                next: "/users?page=3&per_page=2".to_string(),
                prev: "/users?page=1&per_page=2".to_string(),
                last: "/users?page=3&per_page=2".to_string(),
                items: vec!["c".to_string(), "d".to_string()],
            }
        );
    }

    #[test]
    fn test_default_body_omits_empty_links() {
        let p = paged("/users?page=1", 10);
        let body = default_body(&p, serde_json::json!([]));
        assert!(body.get("next").is_none());
        assert!(body.get("prev").is_none());
        assert_eq!(body["last"], "/users?page=1&per_page=25");
        assert_eq!(body["items"], serde_json::json!([]));
    }
}
