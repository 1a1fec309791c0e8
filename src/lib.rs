//! Response rendering helpers for `hyper` services
//!
//! - [`http`]: content negotiation, the response parameter bag and the
//!   format writers (`blob`, `json`, `xml`, files, redirects, ...)
//! - [`render`]: the [`Render`] dispatcher, templates and server-sent events
//! - [`decode`]: request body decoding by `Content-Type`
//! - [`pagination`]: page state, `Link` headers and canonical redirects
//! - [`error`]: error to status mapping
//!
//! ```
//! use hyper::Request;
//! use hyper_render::{Param, Render};
//!
//! let render = Render::default();
//! let req = Request::builder()
//!     .header("accept", "application/json")
//!     .body(())
//!     .unwrap();
//! let resp = render.respond(&req, &vec!["a", "b"], &[Param::Status(200)]);
//! assert_eq!(resp.headers()["content-type"], "application/json; charset=utf-8");
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod http;
pub mod logger;
pub mod pagination;
pub mod render;

pub use config::RenderConfig;
pub use decode::DecodeError;
pub use error::{ApiError, ErrorMap, ErrorResponse, HttpError};
pub use http::{ContentType, HttpResponse, Param};
pub use pagination::Pagination;
pub use render::Render;
