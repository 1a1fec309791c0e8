//! Renderer module
//!
//! [`Render`] holds everything that used to be process-wide state: the
//! configuration, both template engines, the error table and the pluggable
//! treat/pagination hooks. Build one at startup, share it (typically in an
//! `Arc`) and only read it afterwards.

pub mod funcs;
pub mod stream;
pub mod template;

use std::error::Error;
use std::future::Future;
use std::io;

use hyper::body::Body;
use hyper::{HeaderMap, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::decode::{decode_request, DecodeError};
use crate::error::{default_treat, ErrorMap, TreatFn};
use crate::http::params::{self, Param};
use crate::http::response::{self, HttpResponse};
use crate::http::{accepted_content_type, ContentType};
use crate::logger;
use crate::pagination::{
    default_body, default_headers, Pagination, PaginationBodyFn, PaginationHeaderFn,
};

pub use stream::{
    channel, collect_source, BufferedSink, Cancelled, ChannelSink, EventBody, EventSink,
    EventSource, PendingStream, StreamEnd,
};
pub use template::{TemplateEngine, NAMED_TEMPLATE_PREFIX};

/// Content negotiating renderer
pub struct Render {
    config: RenderConfig,
    text: TemplateEngine,
    html: TemplateEngine,
    errors: ErrorMap,
    treat: TreatFn,
    pagination_headers: PaginationHeaderFn,
    pagination_body: PaginationBodyFn,
}

impl Default for Render {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

impl std::fmt::Debug for Render {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Render")
            .field("config", &self.config)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl Render {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            text: TemplateEngine::text(),
            html: TemplateEngine::html(),
            errors: ErrorMap::default(),
            treat: Box::new(default_treat),
            pagination_headers: Box::new(default_headers),
            pagination_body: Box::new(default_body),
        }
    }

    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn text_templates_mut(&mut self) -> &mut TemplateEngine {
        &mut self.text
    }

    pub fn html_templates_mut(&mut self) -> &mut TemplateEngine {
        &mut self.html
    }

    pub fn error_map_mut(&mut self) -> &mut ErrorMap {
        &mut self.errors
    }

    /// Replace the function turning errors into response values
    pub fn set_treat<F>(&mut self, treat: F)
    where
        F: Fn(&HeaderMap, &(dyn Error + 'static)) -> serde_json::Value + Send + Sync + 'static,
    {
        self.treat = Box::new(treat);
    }

    pub fn set_pagination_headers<F>(&mut self, f: F)
    where
        F: Fn(&Pagination) -> HeaderMap + Send + Sync + 'static,
    {
        self.pagination_headers = Box::new(f);
    }

    pub fn set_pagination_body<F>(&mut self, f: F)
    where
        F: Fn(&Pagination, serde_json::Value) -> serde_json::Value + Send + Sync + 'static,
    {
        self.pagination_body = Box::new(f);
    }

    pub(crate) fn pagination_headers(&self, p: &Pagination) -> HeaderMap {
        (self.pagination_headers)(p)
    }

    pub(crate) fn pagination_body(
        &self,
        p: &Pagination,
        items: serde_json::Value,
    ) -> serde_json::Value {
        (self.pagination_body)(p, items)
    }

    /// Format the client asked for, or the configured default
    pub fn accepted<B>(&self, req: &Request<B>) -> ContentType {
        accepted_content_type(req.headers(), self.config.default_content_type)
    }

    /// Render `value` in the format negotiated from the `Accept` header
    ///
    /// Encoding and template failures are answered with a 500 carrying the
    /// error text.
    pub fn respond<T, B>(&self, req: &Request<B>, value: &T, params: &[Param]) -> HttpResponse
    where
        T: Serialize + ?Sized,
    {
        match self.accepted(req) {
            ContentType::Xml => response::xml(value, params),
            ContentType::PlainText | ContentType::Unknown => {
                self.respond_text(&self.text, ContentType::PlainText, value, params)
            }
            ContentType::Html => self.respond_text(&self.html, ContentType::Html, value, params),
            ContentType::EventStream => stream::single_event(req.version(), value, params),
            ContentType::Json | ContentType::Form => response::json(value, params),
        }
    }

    /// Strings are written verbatim; other values go through the `Template`
    /// param when there is one, else their compact JSON text
    fn respond_text<T>(
        &self,
        engine: &TemplateEngine,
        content_type: ContentType,
        value: &T,
        params: &[Param],
    ) -> HttpResponse
    where
        T: Serialize + ?Sized,
    {
        let rendered = match serde_json::to_value(value) {
            Ok(serde_json::Value::String(s)) => Ok(s),
            _ => match params::template(params) {
                Some(source) => engine.render(source, value).map_err(|e| e.to_string()),
                None => serde_json::to_string(value).map_err(|e| e.to_string()),
            },
        };

        let text = match rendered {
            Ok(text) => text,
            Err(e) => {
                logger::log_render_failure("template", 500, &e);
                return response::server_error(StatusCode::INTERNAL_SERVER_ERROR, &e);
            }
        };

        if content_type == ContentType::Html {
            response::html(text, params)
        } else {
            response::plain_text(text, params)
        }
    }

    /// Render everything `source` yields
    ///
    /// An event-stream client gets one frame per item. Other formats get the
    /// items collected into a list; if `cancelled` fires first the answer is
    /// `504 Server Timeout`.
    pub async fn respond_source<S, C, B>(
        &self,
        req: &Request<B>,
        source: S,
        cancelled: C,
        params: &[Param],
    ) -> HttpResponse
    where
        S: EventSource,
        C: Future<Output = ()>,
    {
        if self.accepted(req) == ContentType::EventStream {
            let mut sink = BufferedSink::new();
            if let Err(e) = stream::stream(req.version(), source, &mut sink, cancelled).await {
                logger::log_render_failure("event stream", 500, &e);
                return response::server_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
            }
            return sink.into_response();
        }

        match collect_source(source, cancelled).await {
            Ok(items) => self.respond(req, &items, params),
            Err(Cancelled) => {
                response::server_error(StatusCode::GATEWAY_TIMEOUT, &Cancelled.to_string())
            }
        }
    }

    /// Stream `source` into `sink` as server-sent events
    ///
    /// See [`stream::stream`]; the request only contributes its HTTP version.
    pub async fn stream<S, K, C, B>(
        &self,
        req: &Request<B>,
        source: S,
        sink: &mut K,
        cancelled: C,
    ) -> io::Result<StreamEnd>
    where
        S: EventSource,
        K: EventSink + ?Sized,
        C: Future<Output = ()>,
    {
        stream::stream(req.version(), source, sink, cancelled).await
    }

    /// Render an application error
    ///
    /// The status comes from the error table (500 when nothing matches),
    /// unless an `HttpError` in the chain names one. A `Status` in `params`
    /// overrides both.
    pub fn error<B>(
        &self,
        req: &Request<B>,
        err: &(dyn Error + 'static),
        params: &[Param],
    ) -> HttpResponse {
        let (status, presented) = self.errors.resolve(err);
        let value = (self.treat)(req.headers(), presented);

        let mut all = Vec::with_capacity(params.len() + 1);
        all.extend_from_slice(params);
        all.push(Param::from(status));
        self.respond(req, &value, &all)
    }

    /// Decode the request body according to its `Content-Type`
    ///
    /// `Ok(None)` for plain text, HTML and event-stream bodies.
    pub async fn decode<T, B>(&self, req: Request<B>) -> Result<Option<T>, DecodeError>
    where
        T: DeserializeOwned,
        B: Body,
        B::Error: Into<Box<dyn Error + Send + Sync>>,
    {
        let limit = usize::try_from(self.config.decode.max_body_size).unwrap_or(usize::MAX);
        decode_request(req, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ErrorResponse, HttpError};
    use crate::http::content_type::{
        APPLICATION_JSON, APPLICATION_XML, EVENT_STREAM, TEXT_HTML, TEXT_PLAIN,
    };
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::header::CONTENT_TYPE;
    use serde::Deserialize;
    use std::future;
    use tokio::sync::mpsc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    fn user() -> User {
        User {
            name: "Enver".to_string(),
            age: 33,
        }
    }

    fn get(accept: &str) -> Request<()> {
        Request::builder()
            .uri("/users/1")
            .header("accept", accept)
            .body(())
            .unwrap()
    }

    async fn body_string(resp: HttpResponse) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_respond_json_default() {
        let render = Render::default();
        let resp = render.respond(&get("*/*"), &user(), &[Param::Status(201)]);
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()[CONTENT_TYPE], APPLICATION_JSON);
        assert_eq!(body_string(resp).await, "{\"name\":\"Enver\",\"age\":33}\n");
    }

    #[tokio::test]
    async fn test_respond_xml() {
        let render = Render::default();
        let resp = render.respond(&get("application/xml"), &user(), &[]);
        assert_eq!(resp.headers()[CONTENT_TYPE], APPLICATION_XML);
        assert!(body_string(resp).await.starts_with("<?xml"));
    }

    #[tokio::test]
    async fn test_respond_plain_text() {
        let render = Render::default();
        let resp = render.respond(&get("text/plain"), "hello", &[]);
        assert_eq!(resp.headers()[CONTENT_TYPE], TEXT_PLAIN);
        assert_eq!(body_string(resp).await, "hello");

        let resp = render.respond(
            &get("text/plain"),
            &user(),
            &[Param::template("{{ name }} is {{ age }}")],
        );
        assert_eq!(body_string(resp).await, "Enver is 33");

        let resp = render.respond(&get("text/plain"), &user(), &[]);
        assert_eq!(body_string(resp).await, "{\"name\":\"Enver\",\"age\":33}");
    }

    #[tokio::test]
    async fn test_respond_html_escapes_and_named_templates() {
        let mut render = Render::default();
        render
            .html_templates_mut()
            .add_template("user.html", "<p>{{ name }}</p>")
            .unwrap();

        let evil = User {
            name: "<script>".to_string(),
            age: 1,
        };
        let resp = render.respond(&get("text/html"), &evil, &[Param::template("tmpl://user.html")]);
        assert_eq!(resp.headers()[CONTENT_TYPE], TEXT_HTML);
        assert_eq!(body_string(resp).await, "<p>&lt;script&gt;</p>");
    }

    #[tokio::test]
    async fn test_respond_template_error_is_500() {
        let render = Render::default();
        let resp = render.respond(&get("text/plain"), &user(), &[Param::template("tmpl://missing")]);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[CONTENT_TYPE], TEXT_PLAIN);
    }

    #[test]
    fn test_respond_form_falls_back_to_json() {
        let render = Render::default();
        let resp = render.respond(&get("application/x-www-form-urlencoded"), &user(), &[]);
        assert_eq!(resp.headers()[CONTENT_TYPE], APPLICATION_JSON);
    }

    #[tokio::test]
    async fn test_respond_event_stream_single_value() {
        let render = Render::default();
        let resp = render.respond(&get("text/event-stream"), &user(), &[]);
        assert_eq!(resp.headers()[CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(
            body_string(resp).await,
            "event: data\ndata: {\"name\":\"Enver\",\"age\":33}\n\nevent: EOF\n\n"
        );
    }

    #[test]
    fn test_error_as_event_stream_keeps_status() {
        let render = Render::default();
        let resp = render.error(&get("text/event-stream"), &ApiError::NotFound, &[]);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], EVENT_STREAM);
    }

    #[tokio::test]
    async fn test_template_integer_overflow_is_500() {
        let render = Render::default();
        let value = serde_json::json!({ "n": i64::MAX });
        let resp = render.respond(&get("text/plain"), &value, &[Param::template("{{ incr(n) }}")]);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_respond_source_buffers_items() {
        let render = Render::default();
        let (tx, rx) = mpsc::channel(4);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        drop(tx);

        let resp = render
            .respond_source(&get("application/json"), rx, future::pending(), &[])
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "[1,2]\n");
    }

    #[tokio::test]
    async fn test_respond_source_cancelled_is_504() {
        let render = Render::default();
        let (_tx, rx) = mpsc::channel::<u32>(1);
        let resp = render
            .respond_source(&get("application/json"), rx, future::ready(()), &[])
            .await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_string(resp).await, "Server Timeout\n");
    }

    #[tokio::test]
    async fn test_respond_source_as_event_stream() {
        let render = Render::default();
        let (tx, rx) = mpsc::channel(4);
        tx.send("a").await.unwrap();
        drop(tx);

        let resp = render
            .respond_source(&get("text/event-stream"), rx, future::pending(), &[])
            .await;
        assert_eq!(resp.headers()[CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(
            body_string(resp).await,
            "event: data\ndata: \"a\"\n\nevent: EOF\n\n"
        );
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let render = Render::default();
        let resp = render.error(&get("application/json"), &ApiError::NotFound, &[]);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body.message, "not found");

        let err = HttpError::new(StatusCode::CONFLICT, ApiError::NotFound);
        let resp = render.error(&get("application/json"), &err, &[]);
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = render.error(&get("application/json"), &err, &[Param::Status(418)]);
        assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_error_custom_treat_and_xml() {
        let mut render = Render::default();
        render.set_treat(|_, err| serde_json::json!({ "error": err.to_string(), "code": 7 }));
        let resp = render.error(&get("application/xml"), &ApiError::Forbidden, &[]);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body = body_string(resp).await;
        assert!(body.contains("<error>Forbidden</error>"));
        assert!(body.contains("<code>7</code>"));
    }

    #[tokio::test]
    async fn test_json_round_trip_through_decode() {
        let render = Render::default();
        let resp = render.respond(&get("application/json"), &user(), &[]);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();

        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json; charset=utf-8")
            .body(Full::new(bytes))
            .unwrap();
        let decoded: Option<User> = render.decode(req).await.unwrap();
        assert_eq!(decoded, Some(user()));
    }

    #[tokio::test]
    async fn test_decode_respects_configured_limit() {
        let mut config = RenderConfig::default();
        config.decode.max_body_size = 4;
        let render = Render::new(config);
        let req = Request::builder()
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{\"name\":\"x\",\"age\":1}")))
            .unwrap();
        let err = render.decode::<User, _>(req).await.unwrap_err();
        assert!(matches!(err, DecodeError::Body(_)));
    }
}
