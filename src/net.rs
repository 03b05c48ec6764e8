//! Fluent HTTP requests and their responses.
//!
//! - [`Request`] accumulates configuration and executes one call through a [`Transport`].
//! - [`Response`] exposes the status and a lazily read, buffered body.
//! - [`Client`] holds a transport and offers one-line helpers per method.
mod client;
mod context;
mod method;
pub mod options;
mod request;
mod response;
mod transport;

pub use client::Client;
pub use context::RequestContext;
pub use method::Method;
pub use options::{FormData, RequestOption};
pub use request::Request;
pub use response::Response;
pub use transport::{BodyStream, RawResponse, ReqwestTransport, Transport};
