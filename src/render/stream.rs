//! Server-sent event streaming module
//!
//! An [`EventSource`] yields items until it closes; [`stream`] races it
//! against a cancellation future and writes one `text/event-stream` frame per
//! item into an [`EventSink`]. [`collect_source`] runs the same race but
//! buffers the items instead.

use std::convert::Infallible;
use std::future::{self, Future};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use http_body_util::Full;
use hyper::body::{Body, Bytes, Frame};
use hyper::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode, Version};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::http::content_type::EVENT_STREAM;
use crate::http::params::{self, Param};
use crate::http::response::{encode_json, HttpResponse};
use crate::logger;

const TIMEOUT_FRAME: &[u8] = b"event: error\ndata: {\"error\":\"Server Timeout\"}\n\n";
const EOF_FRAME: &[u8] = b"event: EOF\n\n";

/// A closable source yielding a next value or end-of-stream
pub trait EventSource {
    type Item: Serialize;

    /// Wait for the next item; `None` once the source is closed and drained
    fn next_item(&mut self) -> impl Future<Output = Option<Self::Item>> + Send;
}

impl<T: Serialize + Send> EventSource for mpsc::Receiver<T> {
    type Item = T;

    fn next_item(&mut self) -> impl Future<Output = Option<T>> + Send {
        self.recv()
    }
}

impl<T: Serialize + Send> EventSource for mpsc::UnboundedReceiver<T> {
    type Item = T;

    fn next_item(&mut self) -> impl Future<Output = Option<T>> + Send {
        self.recv()
    }
}

/// Destination of an event stream: the response head, then raw frames
pub trait EventSink {
    fn start(&mut self, head: Response<()>) -> impl Future<Output = io::Result<()>> + Send;

    fn send(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Whether written frames can be pushed to the client before the stream ends
    fn can_flush(&self) -> bool {
        false
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// How a stream finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The source closed; an `EOF` event was written
    Closed,
    /// Cancellation fired first; a `Server Timeout` error event was written
    Cancelled,
}

/// Cancellation won the race against the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Server Timeout")]
pub struct Cancelled;

/// Stream `source` into `sink` as server-sent events until it closes or
/// `cancelled` completes
///
/// Items that fail to encode are reported as `event: error` frames and the
/// stream carries on. A failing sink ends the stream with its error.
pub async fn stream<S, K, C>(
    version: Version,
    mut source: S,
    sink: &mut K,
    cancelled: C,
) -> io::Result<StreamEnd>
where
    S: EventSource,
    K: EventSink + ?Sized,
    C: Future<Output = ()>,
{
    sink.start(stream_head(version)).await?;

    tokio::pin!(cancelled);
    let mut events = 0usize;

    loop {
        tokio::select! {
            () = &mut cancelled => {
                sink.send(Bytes::from_static(TIMEOUT_FRAME)).await?;
                sink.flush()?;
                logger::log_stream_end(events, "cancelled");
                return Ok(StreamEnd::Cancelled);
            }

            item = source.next_item() => {
                let Some(item) = item else {
                    sink.send(Bytes::from_static(EOF_FRAME)).await?;
                    sink.flush()?;
                    logger::log_stream_end(events, "source closed");
                    return Ok(StreamEnd::Closed);
                };

                sink.send(event_frame(&item)).await?;
                events += 1;
                if sink.can_flush() {
                    sink.flush()?;
                }
            }
        }
    }
}

/// Drain `source` into a vector, in order, unless `cancelled` completes first
pub async fn collect_source<S, C>(mut source: S, cancelled: C) -> Result<Vec<S::Item>, Cancelled>
where
    S: EventSource,
    C: Future<Output = ()>,
{
    tokio::pin!(cancelled);
    let mut items = Vec::new();

    loop {
        tokio::select! {
            () = &mut cancelled => return Err(Cancelled),
            item = source.next_item() => match item {
                Some(item) => items.push(item),
                None => return Ok(items),
            }
        }
    }
}

/// Status line and headers of an event stream
///
/// `Connection: keep-alive` is only meaningful for HTTP/1.x and is omitted
/// for later versions.
pub fn stream_head(version: Version) -> Response<()> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .version(version)
        .header(CONTENT_TYPE, EVENT_STREAM)
        .header(CACHE_CONTROL, "no-cache");
    if matches!(version, Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11) {
        builder = builder.header(CONNECTION, "keep-alive");
    }
    builder.body(()).unwrap_or_else(|e| {
        logger::log_error(&format!("Failed to build event stream head: {e}"));
        Response::new(())
    })
}

/// `event: data` frame for `item`, or an `event: error` frame if it cannot be encoded
pub fn event_frame<T: Serialize + ?Sized>(item: &T) -> Bytes {
    match encode_json(item) {
        Ok(mut json) => {
            json.pop();
            let mut frame = Vec::with_capacity(json.len() + 20);
            frame.extend_from_slice(b"event: data\ndata: ");
            frame.extend_from_slice(&json);
            frame.extend_from_slice(b"\n\n");
            Bytes::from(frame)
        }
        Err(e) => error_frame(&e.to_string()),
    }
}

fn error_frame(message: &str) -> Bytes {
    let payload = serde_json::json!({ "error": message });
    Bytes::from(format!("event: error\ndata: {payload}\n\n"))
}

/// A complete stream carrying a single value: one data frame, then `EOF`
///
/// `params` set the status and extra headers; the stream headers win.
pub fn single_event<T: Serialize + ?Sized>(
    version: Version,
    value: &T,
    params: &[Param],
) -> HttpResponse {
    let mut head = stream_head(version);
    let mut headers = HeaderMap::new();
    let status = params::apply(params, &mut headers);
    params::merge_headers(&mut headers, head.headers());
    *head.headers_mut() = headers;
    *head.status_mut() = status;

    let mut sink = BufferedSink::default();
    sink.head = Some(head);
    sink.frames.push(event_frame(value));
    sink.frames.push(Bytes::from_static(EOF_FRAME));
    sink.into_response()
}

/// Sink that keeps everything in memory and becomes a buffered response
#[derive(Debug, Default)]
pub struct BufferedSink {
    head: Option<Response<()>>,
    frames: Vec<Bytes>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames written so far
    pub fn frames(&self) -> &[Bytes] {
        &self.frames
    }

    pub fn into_response(self) -> HttpResponse {
        let head = self.head.unwrap_or_else(|| stream_head(Version::HTTP_11));
        let body: Vec<u8> = self.frames.concat();
        head.map(|()| Full::new(Bytes::from(body)))
    }
}

impl EventSink for BufferedSink {
    fn start(&mut self, head: Response<()>) -> impl Future<Output = io::Result<()>> + Send {
        self.head = Some(head);
        future::ready(Ok(()))
    }

    fn send(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        self.frames.push(frame);
        future::ready(Ok(()))
    }
}

/// Sink that forwards frames to a live response body
///
/// Created by [`channel`]; every frame reaches the client as soon as the
/// connection task polls the body.
#[derive(Debug)]
pub struct ChannelSink {
    head: Option<oneshot::Sender<Response<()>>>,
    frames: mpsc::Sender<Bytes>,
}

/// Receiving half of [`channel`]
#[derive(Debug)]
pub struct PendingStream {
    head: oneshot::Receiver<Response<()>>,
    body: EventBody,
}

/// Streaming response body fed by a [`ChannelSink`]
#[derive(Debug)]
pub struct EventBody {
    frames: mpsc::Receiver<Bytes>,
}

/// Sink/response pair for serving an event stream from a spawned task
///
/// `buffer` bounds the frames queued ahead of the client.
pub fn channel(buffer: usize) -> (ChannelSink, PendingStream) {
    let (head_tx, head_rx) = oneshot::channel();
    let (frame_tx, frame_rx) = mpsc::channel(buffer.max(1));
    (
        ChannelSink {
            head: Some(head_tx),
            frames: frame_tx,
        },
        PendingStream {
            head: head_rx,
            body: EventBody { frames: frame_rx },
        },
    )
}

impl PendingStream {
    /// Wait for the stream head; `None` if the sink was dropped before starting
    pub async fn response(self) -> Option<Response<EventBody>> {
        let head = self.head.await.ok()?;
        Some(head.map(|()| self.body))
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "event stream client went away")
}

impl EventSink for ChannelSink {
    fn start(&mut self, head: Response<()>) -> impl Future<Output = io::Result<()>> + Send {
        let result = match self.head.take() {
            Some(tx) => tx.send(head).map_err(|_| disconnected()),
            None => Err(io::Error::other("event stream already started")),
        };
        future::ready(result)
    }

    fn send(&mut self, frame: Bytes) -> impl Future<Output = io::Result<()>> + Send {
        let frames = &self.frames;
        async move { frames.send(frame).await.map_err(|_| disconnected()) }
    }

    fn can_flush(&self) -> bool {
        true
    }
}

impl Body for EventBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        self.get_mut()
            .frames
            .poll_recv(cx)
            .map(|frame| frame.map(|data| Ok(Frame::data(data))))
    }
}
