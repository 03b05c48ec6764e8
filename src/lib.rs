pub mod config;
pub mod errors;
pub mod net;

pub use config::ClientConfig;
pub use errors::{ConstructionError, Error, ErrorKind, ExecutionError, SerializationError, TransportError};
pub use net::{Client, FormData, Method, Request, RequestContext, RequestOption, Response, Transport};
