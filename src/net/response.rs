//! Response wrapper.
//!
//! The body of a [`Response`] stays on the transport until it is first requested. The first
//! body-consuming call reads the stream to the end and buffers it; every later call, through
//! any accessor, works on those same buffered bytes. Reading the body twice therefore returns
//! identical data.
//!
//! If reading the stream fails, the error is returned and the body is gone: later reads fail
//! with [`ExecutionError::BodyConsumed`] instead of returning partial data.
//!
//! Dropping a `Response` drops the unread stream with it, which releases the connection even
//! when nobody looked at the body.
use futures::StreamExt;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use crate::errors::{Error, ExecutionError, SerializationError};
use crate::net::{BodyStream, RawResponse};

enum BodyState {
    Unread(BodyStream),
    Buffered(Vec<u8>),
    Failed,
}

/// Result of one completed HTTP call.
pub struct Response {
    url: Url,
    status: u16,
    headers: HeaderMap,
    body: BodyState,
}

impl Response {
    pub fn new(raw: RawResponse) -> Self {
        Self {
            url: raw.url,
            status: raw.status,
            headers: raw.headers,
            body: BodyState::Unread(raw.body),
        }
    }

    #[inline]
    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase, "Unknown" for non-standard codes.
    pub fn status_text(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Final URL of the response (after redirects, if any).
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body, reading it from the transport on first use.
    pub async fn body(&mut self) -> Result<&[u8], ExecutionError> {
        let state = std::mem::replace(&mut self.body, BodyState::Failed);
        self.body = match state {
            BodyState::Unread(stream) => BodyState::Buffered(read_to_end(stream).await?),
            other => other,
        };

        match &self.body {
            BodyState::Buffered(bytes) => Ok(bytes),
            _ => Err(ExecutionError::BodyConsumed),
        }
    }

    /// Body as text. Invalid UTF-8 sequences are replaced.
    pub async fn text(&mut self) -> Result<String, ExecutionError> {
        let bytes = self.body().await?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Decodes the body as a JSON object.
    pub async fn body_as_map(&mut self) -> Result<Map<String, Value>, Error> {
        let bytes = self.body().await?;
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(SerializationError::NotAnObject(json_kind(&other)).into()),
        }
    }

    /// Decodes the body as JSON into `T`.
    pub async fn decode_into<T: DeserializeOwned>(&mut self) -> Result<T, Error> {
        let bytes = self.body().await?;
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Consumes the response and returns the body bytes.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>, ExecutionError> {
        self.body().await?;
        match self.body {
            BodyState::Buffered(bytes) => Ok(bytes),
            _ => Err(ExecutionError::BodyConsumed),
        }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.body {
            BodyState::Unread(_) => "unread".to_string(),
            BodyState::Buffered(b) => format!("{} bytes", b.len()),
            BodyState::Failed => "failed".to_string(),
        };
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

async fn read_to_end(mut stream: BodyStream) -> Result<Vec<u8>, ExecutionError> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.map_err(ExecutionError::BodyRead)?);
    }
    Ok(buf)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
