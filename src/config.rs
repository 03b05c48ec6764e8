use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "GosubFetch/0.1 (X11; Linux x86_64) GosubBrowser/1.0";

/// Configuration for the default reqwest-backed transport.
///
/// Per-request cancellation and deadlines do not live here; they are attached to a request
/// through a [`RequestContext`](crate::net::RequestContext).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string sent with every request
    pub user_agent: String,
    /// Overall timeout for a single round trip, None means no limit
    pub timeout: Option<Duration>,
    /// Timeout for establishing the connection
    pub connect_timeout: Option<Duration>,
    /// Maximum number of redirects followed before giving up. 0 disables redirects.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            connect_timeout: Some(Duration::from_secs(30)),
            max_redirects: 10,
        }
    }
}
