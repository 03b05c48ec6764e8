//! The transport seam.
//!
//! A [`Transport`] performs the actual network round trip for a prepared request. The request
//! builder never talks to the network itself, which lets tests swap in an in-memory transport.
//! [`ReqwestTransport`] is the default implementation.
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use http::HeaderMap;
use url::Url;

use crate::config::ClientConfig;
use crate::errors::TransportError;

/// Unread response body, yielded in chunks.
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// A response as handed back by a transport, before any body has been read.
pub struct RawResponse {
    /// Final URL of the response (after redirects, if any).
    pub url: Url,
    /// Numeric HTTP status code
    pub status: u16,
    /// Response headers as a case-insensitive map.
    pub headers: HeaderMap,
    /// Body stream; dropping it releases the underlying connection.
    pub body: BodyStream,
}

impl RawResponse {
    /// Builds a response whose body is already fully in memory.
    pub fn from_bytes(url: Url, status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        Self {
            url,
            status,
            headers,
            body: futures::stream::once(async move { Ok(body) }).boxed(),
        }
    }
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"...")
            .finish()
    }
}

/// Performs one HTTP round trip.
///
/// Implementations must be `Send + Sync` so a single transport can be shared by any number of
/// requests through an `Arc`. A non-2xx status is a successful round trip, not an error.
pub trait Transport: Send + Sync {
    fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, Result<RawResponse, TransportError>>;
}

/// Transport backed by a [`reqwest::Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self { client: builder.build()? })
    }

    /// Wraps an already configured reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
        Box::pin(async move {
            let request = reqwest::Request::try_from(request)?;
            let res = self.client.execute(request).await?;

            let url = res.url().clone();
            let status = res.status().as_u16();
            let headers = res.headers().clone();

            // Body stays on the wire until the caller reads it
            let body = res
                .bytes_stream()
                .map_ok(|chunk| chunk.to_vec())
                .map_err(TransportError::from)
                .boxed();

            Ok(RawResponse {
                url,
                status,
                headers,
                body,
            })
        })
    }
}
