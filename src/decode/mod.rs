//! Request body decoding module
//!
//! Chooses JSON, XML or form decoding from the request `Content-Type`.
//! Plain text, HTML and event-stream bodies are reserved and left untouched.

use std::io::{self, BufReader, Read};
use std::pin::pin;

use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::Request;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::{request_content_type, ContentType};
use crate::logger;

/// Failure while decoding a request body
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("render: unable to automatically decode the request content type")]
    UnknownContentType,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML body: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    /// The body could not be read or exceeded the size limit
    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Decode the request body according to its `Content-Type`
///
/// Returns `Ok(None)` for the reserved formats. The body is read to the end
/// before parsing, whatever the outcome; past `max_body_size` bytes the rest
/// is discarded and the result is `DecodeError::Body`.
pub async fn decode_request<T, B>(
    req: Request<B>,
    max_body_size: usize,
) -> Result<Option<T>, DecodeError>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_type = request_content_type(req.headers());
    match content_type {
        ContentType::PlainText | ContentType::Html | ContentType::EventStream => return Ok(None),
        ContentType::Unknown => return Err(DecodeError::UnknownContentType),
        ContentType::Json | ContentType::Xml | ContentType::Form => {}
    }

    let body = read_body(req.into_body(), max_body_size).await?;
    let value = match content_type {
        ContentType::Json => serde_json::from_slice(&body)?,
        ContentType::Xml => quick_xml::de::from_reader(&body[..])?,
        _ => serde_urlencoded::from_bytes(&body)?,
    };
    Ok(Some(value))
}

async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, DecodeError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut body = pin!(body);
    match Limited::new(body.as_mut(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            logger::log_debug("decode", &format!("request body rejected: {e}"));
            while let Some(frame) = body.frame().await {
                if frame.is_err() {
                    break;
                }
            }
            Err(DecodeError::Body(e.to_string()))
        }
    }
}

/// Decode JSON from `reader`, then drain whatever is left
pub fn decode_json<T: DeserializeOwned>(mut reader: impl Read) -> Result<T, DecodeError> {
    let result = serde_json::from_reader(&mut reader);
    drain(&mut reader);
    Ok(result?)
}

/// Decode XML from `reader`, then drain whatever is left
pub fn decode_xml<T: DeserializeOwned>(reader: impl Read) -> Result<T, DecodeError> {
    let mut reader = BufReader::new(reader);
    let result = quick_xml::de::from_reader(&mut reader);
    drain(&mut reader);
    Ok(result?)
}

/// Decode an `application/x-www-form-urlencoded` body from `reader`
pub fn decode_form<T: DeserializeOwned>(mut reader: impl Read) -> Result<T, DecodeError> {
    let result = serde_urlencoded::from_reader(&mut reader);
    drain(&mut reader);
    Ok(result?)
}

fn drain(reader: &mut impl Read) {
    if let Err(e) = io::copy(reader, &mut io::sink()) {
        logger::log_debug("decode", &format!("failed to drain request body: {e}"));
    }
}
