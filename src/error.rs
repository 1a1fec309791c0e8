//! Error mapping module
//!
//! Turns application errors into a status code and a presentable body.
//! Sentinel errors are matched anywhere in the `source()` chain, and an
//! [`HttpError`] in the chain carries an explicit status that overrides them.

use std::error::Error;
use std::iter;

use hyper::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Predefined application errors with a default status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid or missing token")]
    InvalidToken,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
}

/// An error with an explicit response status
///
/// Displays as its source, which is also what gets presented to the client.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct HttpError {
    pub status: StatusCode,
    #[source]
    pub source: Box<dyn Error + Send + Sync>,
}

impl HttpError {
    pub fn new(status: StatusCode, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }
}

/// Default error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Converts the error that will be presented into a response value
pub type TreatFn =
    Box<dyn Fn(&HeaderMap, &(dyn Error + 'static)) -> serde_json::Value + Send + Sync>;

/// `{"message": "<error text>"}`
pub fn default_treat(_headers: &HeaderMap, err: &(dyn Error + 'static)) -> serde_json::Value {
    serde_json::json!({ "message": err.to_string() })
}

type Matcher = Box<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;

/// Error to status table
///
/// Every entry is checked against every error in the chain; when several
/// entries match, the one inserted last wins.
pub struct ErrorMap {
    entries: Vec<(Matcher, StatusCode)>,
}

impl ErrorMap {
    /// An empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Map errors equal to `sentinel`
    pub fn insert<E>(&mut self, sentinel: E, status: StatusCode)
    where
        E: Error + PartialEq + Send + Sync + 'static,
    {
        self.insert_with(move |e: &E| *e == sentinel, status);
    }

    /// Map errors of type `E` accepted by `predicate`
    pub fn insert_with<E, F>(&mut self, predicate: F, status: StatusCode)
    where
        E: Error + 'static,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let matcher = move |err: &(dyn Error + 'static)| {
            err.downcast_ref::<E>().is_some_and(&predicate)
        };
        self.entries.push((Box::new(matcher), status));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status of the last entry matching anywhere in the chain of `err`
    pub fn lookup(&self, err: &(dyn Error + 'static)) -> Option<StatusCode> {
        self.entries
            .iter()
            .filter(|(matches, _)| chain(err).any(|e| matches(e)))
            .map(|(_, status)| *status)
            .last()
    }

    /// Status for `err` (500 when nothing matches) and the error to present
    ///
    /// An `HttpError` in the chain decides the status and is replaced by its source.
    pub fn resolve<'a>(
        &self,
        err: &'a (dyn Error + 'static),
    ) -> (StatusCode, &'a (dyn Error + 'static)) {
        let status = self
            .lookup(err)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let Some(http) = chain(err).find_map(|e| e.downcast_ref::<HttpError>()) {
            let inner: &(dyn Error + 'static) = &*http.source;
            return (http.status, inner);
        }
        (status, err)
    }
}

impl Default for ErrorMap {
    fn default() -> Self {
        let mut map = Self::new();
        map.insert(ApiError::InvalidToken, StatusCode::BAD_REQUEST);
        map.insert(ApiError::Unauthorized, StatusCode::UNAUTHORIZED);
        map.insert(ApiError::Forbidden, StatusCode::FORBIDDEN);
        map.insert(ApiError::NotFound, StatusCode::NOT_FOUND);
        map
    }
}

impl std::fmt::Debug for ErrorMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorMap")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    iter::successors(Some(err), |&e| e.source())
}
