use std::collections::{BTreeMap, HashMap};

use crate::net::RequestContext;

/// Form fields sent as `application/x-www-form-urlencoded`.
///
/// Fields are kept sorted so the encoded body is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormData(BTreeMap<String, String>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the fields the way an HTML form would submit them.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<HashMap<String, String>> for FormData {
    fn from(m: HashMap<String, String>) -> Self {
        m.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for FormData {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A single unit of request configuration.
///
/// Options can be passed to [`Request::new`](crate::net::Request::new) or applied later through
/// the matching `with_*` method on the request; both paths end up in `Request::apply`.
#[derive(Clone, Debug)]
pub enum RequestOption {
    /// Form-encoded body, replaces any previous body and Content-Type
    Form(FormData),
    /// Raw JSON body, replaces any previous body and Content-Type
    Json(String),
    /// Headers merged into the staged header set, last write wins per name
    Headers(HashMap<String, String>),
    /// Stages `Authorization: Bearer <token>`
    BearerToken(String),
    /// Cancellation and deadline for the execution
    Context(RequestContext),
}

pub fn with_data(data: impl Into<FormData>) -> RequestOption {
    RequestOption::Form(data.into())
}

pub fn with_json(json: impl Into<String>) -> RequestOption {
    RequestOption::Json(json.into())
}

pub fn with_headers<K, V>(headers: impl IntoIterator<Item = (K, V)>) -> RequestOption
where
    K: Into<String>,
    V: Into<String>,
{
    RequestOption::Headers(
        headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    )
}

pub fn with_bearer_token(token: impl Into<String>) -> RequestOption {
    RequestOption::BearerToken(token.into())
}

pub fn with_context(ctx: RequestContext) -> RequestOption {
    RequestOption::Context(ctx)
}
