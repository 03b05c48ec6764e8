use crate::net::Method;

/// Failure reported by a [`Transport`](crate::net::Transport) implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Raised while building a request. No partial request is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("url {url:?} cannot be used as a request target: {source}")]
    InvalidUri {
        url: String,
        #[source]
        source: http::uri::InvalidUri,
    },

    #[error("url {0:?} has no host")]
    MissingHost(String),

    #[error("unsupported url scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid http method {0:?}")]
    InvalidMethod(String),
}

/// Raised while executing a request or reading its response body.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("{method} {url}: request canceled")]
    Canceled { method: Method, url: String },

    #[error("{method} {url}: deadline exceeded")]
    DeadlineExceeded { method: Method, url: String },

    #[error("failed to do http request {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("{method} {url}: invalid header {name:?}")]
    InvalidHeader { method: Method, url: String, name: String },

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] TransportError),

    #[error("response body is no longer available after a failed read")]
    BodyConsumed,

    #[error("cannot start blocking runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("send_blocking called from within an async runtime, use send() instead")]
    NestedRuntime,
}

/// Raised when a response body cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json body is {0}, expected an object")]
    NotAnObject(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    Execution,
    Serialization,
}

/// Any error produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Construction(_) => ErrorKind::Construction,
            Error::Execution(_) => ErrorKind::Execution,
            Error::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(SerializationError::Json(e))
    }
}
