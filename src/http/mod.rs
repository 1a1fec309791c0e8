//! HTTP protocol layer module
//!
//! Content negotiation, the response parameter bag and the response writers.
//! Nothing here knows about templates, pagination or error mapping; those
//! layers build on these functions.

pub mod cache;
pub mod content_type;
pub mod file;
pub mod params;
pub mod query;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use content_type::{accepted_content_type, request_content_type, ContentType};
pub use file::{attachment, file, inline};
pub use params::Param;
pub use response::{
    blob, html, json, no_content, plain_text, redirect, server_error, xml, HttpResponse,
};
