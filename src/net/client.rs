use std::sync::Arc;

use crate::config::ClientConfig;
use crate::errors::{Error, TransportError};
use crate::net::options::RequestOption;
use crate::net::{Method, ReqwestTransport, Request, Response, Transport};

/// Entry point holding the transport that all its requests are sent through.
///
/// Cloning a client is cheap; clones share the same transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Creates a client backed by reqwest, configured from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(&config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    #[inline]
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Builds a request without sending it.
    pub fn request(
        &self,
        target_url: &str,
        method: Method,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Result<Request, Error> {
        Ok(Request::new(self.transport.clone(), target_url, method, options)?)
    }

    pub async fn get(&self, target_url: &str) -> Result<Response, Error> {
        self.send(target_url, Method::Get, []).await
    }

    pub async fn post(&self, target_url: &str, options: impl IntoIterator<Item = RequestOption>) -> Result<Response, Error> {
        self.send(target_url, Method::Post, options).await
    }

    pub async fn put(&self, target_url: &str, options: impl IntoIterator<Item = RequestOption>) -> Result<Response, Error> {
        self.send(target_url, Method::Put, options).await
    }

    pub async fn patch(&self, target_url: &str, options: impl IntoIterator<Item = RequestOption>) -> Result<Response, Error> {
        self.send(target_url, Method::Patch, options).await
    }

    pub async fn delete(&self, target_url: &str) -> Result<Response, Error> {
        self.send(target_url, Method::Delete, []).await
    }

    async fn send(
        &self,
        target_url: &str,
        method: Method,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Result<Response, Error> {
        let req = self.request(target_url, method, options)?;
        Ok(req.send().await?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}
