//! Fluent request builder.
//!
//! A [`Request`] collects configuration and dispatches a single HTTP call through a
//! [`Transport`]. Configuration is applied in two ways:
//!
//! - **immediate**: form and JSON bodies write the body and `Content-Type` straight into the
//!   transport header set the moment they are applied.
//! - **staged**: headers and bearer tokens are collected separately and laid over the transport
//!   header set right before dispatch.
//!
//! Because staged headers are applied last, a staged `Content-Type` wins over the one set by a
//! body mutator no matter in which order the two were configured.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use gosub_fetch::net::{options, Method, ReqwestTransport, Request};
//! use gosub_fetch::ClientConfig;
//!
//! # async fn run() -> Result<(), gosub_fetch::Error> {
//! let transport = Arc::new(ReqwestTransport::new(&ClientConfig::default()).unwrap());
//! let mut resp = Request::new(transport, "https://httpbin.org/bearer", Method::Get, [
//!         options::with_headers([("Accept", "application/json")]),
//!     ])?
//!     .with_bearer_token("secret")
//!     .send()
//!     .await?;
//!
//! println!("{} {:?}", resp.status_code(), resp.body_as_map().await?);
//! # Ok(())
//! # }
//! ```
use std::collections::HashMap;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::HeaderMap;
use url::Url;

use crate::errors::{ConstructionError, ExecutionError};
use crate::net::options::{self, FormData, RequestOption};
use crate::net::{Method, RequestContext, Response, Transport};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// One pending HTTP call.
pub struct Request {
    url: Url,
    uri: http::Uri,
    method: Method,
    /// Header set of the transport request, written by the body mutators
    headers: HeaderMap,
    /// Headers applied on top of `headers` at dispatch
    staged: HeaderMap,
    /// Staged header names whose last write could not be encoded; `send` refuses to dispatch
    rejected: Vec<String>,
    body: Option<Vec<u8>>,
    context: Option<RequestContext>,
    transport: Arc<dyn Transport>,
}

impl Request {
    /// Creates a request for `target_url` and applies `options` in order.
    pub fn new(
        transport: Arc<dyn Transport>,
        target_url: &str,
        method: Method,
        options: impl IntoIterator<Item = RequestOption>,
    ) -> Result<Self, ConstructionError> {
        let (url, uri) = parse_target(target_url)?;

        let mut req = Self {
            url,
            uri,
            method,
            headers: HeaderMap::new(),
            staged: HeaderMap::new(),
            rejected: Vec::new(),
            body: None,
            context: None,
            transport,
        };

        for opt in options {
            req.apply(opt);
        }

        Ok(req)
    }

    /// Applies a single configuration item.
    pub fn apply(&mut self, opt: RequestOption) {
        match opt {
            RequestOption::Form(data) => self.set_form(&data),
            RequestOption::Json(json) => self.set_json(json),
            RequestOption::Headers(headers) => self.stage_headers(headers),
            RequestOption::BearerToken(token) => self.stage_bearer(&token),
            RequestOption::Context(ctx) => self.context = Some(ctx),
        }
    }

    /// Chaining form of [`Request::apply`].
    pub fn with(mut self, opt: RequestOption) -> Self {
        self.apply(opt);
        self
    }

    pub fn with_data(mut self, data: impl Into<FormData>) -> Self {
        self.apply(RequestOption::Form(data.into()));
        self
    }

    pub fn with_json(mut self, json: impl Into<String>) -> Self {
        self.apply(RequestOption::Json(json.into()));
        self
    }

    pub fn with_headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with(options::with_headers(headers))
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.apply(RequestOption::BearerToken(token.into()));
        self
    }

    pub fn with_context(mut self, ctx: RequestContext) -> Self {
        self.apply(RequestOption::Context(ctx));
        self
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn method(&self) -> Method {
        self.method
    }

    #[inline]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    #[inline]
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    /// Header names that were configured with a value that cannot be sent.
    #[inline]
    pub fn rejected_headers(&self) -> &[String] {
        &self.rejected
    }

    /// Returns the header set exactly as it will be dispatched.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        for (name, value) in self.staged.iter() {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    /// Builds the transport-ready request. Can be called any number of times; every call
    /// produces an identical request. Rejected headers are not part of it.
    pub fn prepare(&self) -> http::Request<Vec<u8>> {
        let mut req = http::Request::new(self.body.clone().unwrap_or_default());
        *req.method_mut() = self.method.into();
        *req.uri_mut() = self.uri.clone();
        *req.headers_mut() = self.headers();
        req
    }

    /// Executes the request.
    ///
    /// Any status code the server answers with is a success at this level; only transport
    /// failures, unsendable headers, cancellation and an elapsed deadline are errors.
    pub async fn send(&self) -> Result<Response, ExecutionError> {
        if let Some(name) = self.rejected.first() {
            let err = ExecutionError::InvalidHeader {
                method: self.method,
                url: self.url.to_string(),
                name: name.clone(),
            };
            log::error!("{}", err);
            return Err(err);
        }
        if let Some(ctx) = &self.context {
            if ctx.is_cancelled() {
                return Err(self.canceled());
            }
            if ctx.is_expired() {
                return Err(self.deadline_exceeded());
            }
        }

        let prepared = self.prepare();
        log::debug!("{} {}: dispatching ({} body bytes)", self.method, self.url, prepared.body().len());

        let fut = self.transport.execute(prepared);
        let res = match &self.context {
            None => fut.await,
            Some(ctx) => {
                let deadline = async {
                    match ctx.deadline() {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => futures::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = ctx.token().cancelled() => {
                        log::debug!("{} {}: canceled", self.method, self.url);
                        return Err(self.canceled());
                    }
                    _ = deadline => {
                        log::debug!("{} {}: deadline exceeded", self.method, self.url);
                        return Err(self.deadline_exceeded());
                    }
                    r = fut => r,
                }
            }
        };

        match res {
            Ok(raw) => {
                log::debug!("{} {}: status {}", self.method, self.url, raw.status);
                Ok(Response::new(raw))
            }
            Err(e) => {
                let err = ExecutionError::Transport {
                    method: self.method,
                    url: self.url.to_string(),
                    source: e,
                };
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    /// Executes the request on a private current-thread runtime and blocks until done.
    ///
    /// Fails with [`ExecutionError::NestedRuntime`] when called from within a tokio runtime.
    pub fn send_blocking(&self) -> Result<Response, ExecutionError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ExecutionError::NestedRuntime);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ExecutionError::Runtime)?;

        runtime.block_on(self.send())
    }

    fn set_form(&mut self, data: &FormData) {
        self.body = Some(data.encode().into_bytes());
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    }

    fn set_json(&mut self, json: String) {
        self.body = Some(json.into_bytes());
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    }

    fn stage_headers(&mut self, headers: HashMap<String, String>) {
        for (k, v) in headers {
            let name = match HeaderName::from_bytes(k.as_bytes()) {
                Ok(name) => name,
                Err(_) => {
                    log::warn!("{} {}: invalid header name {:?}", self.method, self.url, k);
                    self.reject(k);
                    continue;
                }
            };
            match HeaderValue::from_str(&v) {
                Ok(value) => self.stage(name, value),
                Err(_) => {
                    log::warn!("{} {}: invalid value for header {}", self.method, self.url, name);
                    self.staged.remove(&name);
                    self.reject(name.as_str().to_string());
                }
            }
        }
    }

    fn stage_bearer(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.stage(AUTHORIZATION, value);
            }
            Err(_) => {
                log::warn!("{} {}: bearer token contains invalid characters", self.method, self.url);
                self.staged.remove(AUTHORIZATION);
                self.reject(AUTHORIZATION.as_str().to_string());
            }
        }
    }

    /// A valid write clears an earlier rejection of the same header.
    fn stage(&mut self, name: HeaderName, value: HeaderValue) {
        self.rejected.retain(|r| r != name.as_str());
        self.staged.insert(name, value);
    }

    fn reject(&mut self, name: String) {
        if !self.rejected.contains(&name) {
            self.rejected.push(name);
        }
    }

    fn canceled(&self) -> ExecutionError {
        ExecutionError::Canceled {
            method: self.method,
            url: self.url.to_string(),
        }
    }

    fn deadline_exceeded(&self) -> ExecutionError {
        ExecutionError::DeadlineExceeded {
            method: self.method,
            url: self.url.to_string(),
        }
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers())
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("context", &self.context)
            .finish()
    }
}

fn parse_target(target_url: &str) -> Result<(Url, http::Uri), ConstructionError> {
    let url = Url::parse(target_url).map_err(|source| ConstructionError::InvalidUrl {
        url: target_url.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConstructionError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConstructionError::MissingHost(target_url.to_string()));
    }

    let uri = url
        .as_str()
        .parse::<http::Uri>()
        .map_err(|source| ConstructionError::InvalidUri {
            url: target_url.to_string(),
            source,
        })?;

    Ok((url, uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::net::options::{with_bearer_token, with_context, with_data, with_headers, with_json};
    use crate::net::RawResponse;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory transport recording every request it receives.
    #[derive(Default)]
    struct FakeTransport {
        status: u16,
        body: String,
        delay: Option<Duration>,
        fail: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<(http::Method, String, HeaderMap, Vec<u8>)>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                ..Default::default()
            })
        }

        fn last(&self) -> (http::Method, String, HeaderMap, Vec<u8>) {
            self.seen.lock().unwrap().last().cloned().expect("no request seen")
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: http::Request<Vec<u8>>) -> BoxFuture<'_, Result<RawResponse, TransportError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                if self.fail {
                    return Err(TransportError::Other("connection refused".into()));
                }

                let (parts, body) = request.into_parts();
                let url = Url::parse(&parts.uri.to_string()).unwrap();
                self.seen
                    .lock()
                    .unwrap()
                    .push((parts.method, parts.uri.to_string(), parts.headers, body));

                Ok(RawResponse::from_bytes(url, self.status, HeaderMap::new(), self.body.clone()))
            })
        }
    }

    fn header(h: &HeaderMap, name: &str) -> Vec<String> {
        h.get_all(name)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn malformed_urls_fail_construction() {
        let t = FakeTransport::replying(200, "");

        assert!(matches!(
            Request::new(t.clone(), "not a url", Method::Get, []),
            Err(ConstructionError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Request::new(t.clone(), "ftp://example.com/file", Method::Get, []),
            Err(ConstructionError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(matches!(
            Request::new(t, "http://", Method::Get, []),
            Err(ConstructionError::InvalidUrl { .. }) | Err(ConstructionError::MissingHost(_))
        ));
    }

    #[test]
    fn header_mappings_merge_with_later_values_winning() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Get, [])
            .unwrap()
            .with_headers(map(&[("Accept", "text/html"), ("X-One", "1")]))
            .with_headers(map(&[("accept", "application/json"), ("X-Two", "2")]));

        let h = req.headers();
        assert_eq!(header(&h, "accept"), vec!["application/json"]);
        assert_eq!(header(&h, "x-one"), vec!["1"]);
        assert_eq!(header(&h, "x-two"), vec!["2"]);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn second_bearer_token_replaces_the_first() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Get, [with_bearer_token("t1")])
            .unwrap()
            .with_bearer_token("t2");

        assert_eq!(header(&req.headers(), "authorization"), vec!["Bearer t2"]);
    }

    #[test]
    fn json_after_form_replaces_body_and_content_type() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Post, [with_data([("name", "John")])])
            .unwrap()
            .with_json(r#"{"name":"Jane"}"#);

        assert_eq!(req.body(), Some(&br#"{"name":"Jane"}"#[..]));
        assert_eq!(header(&req.headers(), "content-type"), vec![JSON_CONTENT_TYPE]);
    }

    #[test]
    fn form_after_json_replaces_body_and_content_type() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Post, [with_json("{}")])
            .unwrap()
            .with_data([("age", "25"), ("name", "Jane Doe")]);

        assert_eq!(req.body(), Some(&b"age=25&name=Jane+Doe"[..]));
        assert_eq!(header(&req.headers(), "content-type"), vec![FORM_CONTENT_TYPE]);
    }

    #[test]
    fn staged_content_type_wins_over_body_mutator_in_any_order() {
        let t = FakeTransport::replying(200, "");
        let ct = map(&[("Content-Type", "text/plain")]);

        let before = Request::new(t.clone(), "https://example.com/", Method::Post, [])
            .unwrap()
            .with_headers(ct.clone())
            .with_json("{}");
        let after = Request::new(t, "https://example.com/", Method::Post, [])
            .unwrap()
            .with_json("{}")
            .with_headers(ct);

        assert_eq!(header(&before.headers(), "content-type"), vec!["text/plain"]);
        assert_eq!(header(&after.headers(), "content-type"), vec!["text/plain"]);
    }

    #[test]
    fn chained_configuration_equals_constructor_options() {
        let t = FakeTransport::replying(200, "");
        let h = map(&[("Accept", "application/json"), ("X-Trace", "abc")]);

        let via_ctor = Request::new(
            t.clone(),
            "https://example.com/post",
            Method::Post,
            [with_headers(h.clone()), with_bearer_token("tok"), with_json(r#"{"a":1}"#)],
        )
        .unwrap();
        let via_chain = Request::new(t, "https://example.com/post", Method::Post, [])
            .unwrap()
            .with_headers(h)
            .with_bearer_token("tok")
            .with_json(r#"{"a":1}"#);

        let a = via_ctor.prepare();
        let b = via_chain.prepare();
        assert_eq!(a.method(), b.method());
        assert_eq!(a.uri(), b.uri());
        assert_eq!(a.headers(), b.headers());
        assert_eq!(a.body(), b.body());
    }

    #[test]
    fn invalid_headers_are_recorded_and_kept_off_the_wire() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Get, [])
            .unwrap()
            .with_headers(map(&[("bad header", "x"), ("X-Ok", "yes"), ("X-Bad", "line\nbreak")]));

        let h = req.headers();
        assert_eq!(h.len(), 1);
        assert_eq!(header(&h, "x-ok"), vec!["yes"]);

        let mut rejected = req.rejected_headers().to_vec();
        rejected.sort();
        assert_eq!(rejected, vec!["bad header".to_string(), "x-bad".to_string()]);
    }

    #[test]
    fn chained_headers_accept_any_pairs() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Get, [])
            .unwrap()
            .with_headers([("Accept", "text/plain")])
            .with_headers(vec![("X-Id".to_string(), "7".to_string())]);

        let h = req.headers();
        assert_eq!(header(&h, "accept"), vec!["text/plain"]);
        assert_eq!(header(&h, "x-id"), vec!["7"]);
    }

    #[test]
    fn url_too_long_for_a_request_target_fails_construction() {
        let t = FakeTransport::replying(200, "");
        let target = format!("https://example.com/?q={}", "a".repeat(70_000));

        match Request::new(t, &target, Method::Get, []) {
            Err(ConstructionError::InvalidUri { url, .. }) => assert_eq!(url.len(), target.len()),
            other => panic!("expected InvalidUri, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn bearer_token_with_line_break_fails_send() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, [])
            .unwrap()
            .with_bearer_token("abc\ndef");

        match req.send().await {
            Err(ExecutionError::InvalidHeader { name, .. }) => assert_eq!(name, "authorization"),
            other => panic!("expected InvalidHeader, got {:?}", other.map(|r| r.status_code())),
        }
        assert!(req.headers().get(AUTHORIZATION).is_none());
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_header_value_fails_send() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, [])
            .unwrap()
            .with_headers([("X-Bad", "line\r\nX-Injected: 1")]);

        assert!(matches!(req.send().await, Err(ExecutionError::InvalidHeader { name, .. }) if name == "x-bad"));
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn later_valid_value_clears_a_rejected_header() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, [with_bearer_token("bad\ntoken")])
            .unwrap()
            .with_bearer_token("good");

        assert!(req.rejected_headers().is_empty());
        req.send().await.unwrap();
        assert_eq!(header(&t.last().2, "authorization"), vec!["Bearer good"]);
    }

    #[test]
    fn no_body_mutator_means_empty_body_and_no_content_type() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t, "https://example.com/", Method::Get, []).unwrap();

        assert!(req.body().is_none());
        let prepared = req.prepare();
        assert!(prepared.body().is_empty());
        assert!(prepared.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(prepared.method(), http::Method::GET);
        assert_eq!(prepared.uri().to_string(), "https://example.com/");
    }

    #[tokio::test]
    async fn send_dispatches_configured_request() {
        let t = FakeTransport::replying(200, r#"{"ok":true}"#);
        let req = Request::new(t.clone(), "https://example.com/post?x=1", Method::Post, [with_data([("a", "b")])])
            .unwrap()
            .with_bearer_token("secret");

        let mut resp = req.send().await.unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.body_as_map().await.unwrap()["ok"], serde_json::Value::Bool(true));

        let (method, uri, headers, body) = t.last();
        assert_eq!(method, http::Method::POST);
        assert_eq!(uri, "https://example.com/post?x=1");
        assert_eq!(header(&headers, "authorization"), vec!["Bearer secret"]);
        assert_eq!(header(&headers, "content-type"), vec![FORM_CONTENT_TYPE]);
        assert_eq!(body, b"a=b");
    }

    #[tokio::test]
    async fn client_error_status_is_not_an_execution_error() {
        let t = FakeTransport::replying(403, "forbidden");
        let req = Request::new(t, "https://example.com/status/403", Method::Get, []).unwrap();

        let resp = req.send().await.expect("403 must not be an error");
        assert_eq!(resp.status_code(), 403);
    }

    #[tokio::test]
    async fn resending_replays_the_same_body() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t.clone(), "https://example.com/", Method::Put, [with_json(r#"{"v":1}"#)]).unwrap();

        req.send().await.unwrap();
        let first = t.last();
        req.send().await.unwrap();
        let second = t.last();

        assert_eq!(first.3, br#"{"v":1}"#);
        assert_eq!(first.3, second.3);
        assert_eq!(first.2, second.2);
        assert_eq!(t.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn elapsed_deadline_fails_without_calling_transport() {
        let t = FakeTransport::replying(200, "");
        let ctx = RequestContext::with_timeout(Duration::ZERO);
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, [with_context(ctx)]).unwrap();

        match req.send().await {
            Err(ExecutionError::DeadlineExceeded { method, .. }) => assert_eq!(method, Method::Get),
            other => panic!("expected DeadlineExceeded, got {:?}", other.map(|r| r.status_code())),
        }
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn canceled_context_fails_without_calling_transport() {
        let t = FakeTransport::replying(200, "");
        let ctx = RequestContext::new();
        ctx.cancel();
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, [])
            .unwrap()
            .with_context(ctx);

        assert!(matches!(req.send().await, Err(ExecutionError::Canceled { .. })));
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deadline_elapsing_during_round_trip_fails() {
        let t = Arc::new(FakeTransport {
            status: 200,
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let req = Request::new(t.clone(), "https://example.com/delay/5", Method::Get, [])
            .unwrap()
            .with_context(RequestContext::with_timeout(Duration::from_millis(20)));

        assert!(matches!(req.send().await, Err(ExecutionError::DeadlineExceeded { .. })));
        assert_eq!(t.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_during_round_trip_fails() {
        let t = Arc::new(FakeTransport {
            status: 200,
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let ctx = RequestContext::new();
        let req = Request::new(t, "https://example.com/", Method::Get, [with_context(ctx.clone())]).unwrap();

        let canceler = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.cancel();
        });

        assert!(matches!(req.send().await, Err(ExecutionError::Canceled { .. })));
        canceler.await.unwrap();
    }

    #[tokio::test]
    async fn transport_failure_is_wrapped_with_context() {
        let t = Arc::new(FakeTransport {
            fail: true,
            ..Default::default()
        });
        let req = Request::new(t, "http://localhost:1/", Method::Delete, []).unwrap();

        match req.send().await {
            Err(ExecutionError::Transport { method, url, source }) => {
                assert_eq!(method, Method::Delete);
                assert_eq!(url, "http://localhost:1/");
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("expected Transport error, got {:?}", other.map(|r| r.status_code())),
        }
    }

    #[test]
    fn send_blocking_runs_outside_a_runtime() {
        let t = FakeTransport::replying(201, "created");
        let req = Request::new(t, "https://example.com/", Method::Post, []).unwrap();

        let resp = req.send_blocking().unwrap();
        assert_eq!(resp.status_code(), 201);
    }

    #[tokio::test]
    async fn send_blocking_inside_a_runtime_is_an_error() {
        let t = FakeTransport::replying(200, "");
        let req = Request::new(t.clone(), "https://example.com/", Method::Get, []).unwrap();

        assert!(matches!(req.send_blocking(), Err(ExecutionError::NestedRuntime)));
        assert_eq!(t.calls.load(Ordering::SeqCst), 0);
    }
}
