//! Core types for request shaping.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace prefix of hook registry events.
pub const HOOK_NAMESPACE: &str = "openFetch";

/// Ordered mapping from placeholder name to scalar value.
pub type PathParams = IndexMap<String, PathValue>;

/// Query parameters forwarded to the transport.
pub type QueryParams = IndexMap<String, Value>;

/// Body transformation applied before headers are built.
pub type BodySerializer = Arc<dyn Fn(Body) -> Body + Send + Sync>;

/// HTTP method of an operation.
///
/// Accepts both lowercase and uppercase spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "GET")]
    Get,
    #[serde(alias = "HEAD")]
    Head,
    #[serde(alias = "POST")]
    Post,
    #[serde(alias = "PUT")]
    Put,
    #[serde(alias = "PATCH")]
    Patch,
    #[serde(alias = "DELETE")]
    Delete,
    #[serde(alias = "OPTIONS")]
    Options,
    #[serde(alias = "TRACE")]
    Trace,
}

impl HttpMethod {
    /// Parse a method name case-insensitively.
    ///
    /// Returns `None` for unknown methods.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "head" => Some(HttpMethod::Head),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "options" => Some(HttpMethod::Options),
            "trace" => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    /// Lowercase method name, as written in OpenAPI path items.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Head => "head",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }

    pub fn to_http(self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Options => http::Method::OPTIONS,
            HttpMethod::Trace => http::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media types accepted for the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Accept {
    Single(String),
    Many(Vec<String>),
}

impl Accept {
    /// Value of the `Accept` header: the single media type verbatim, or the
    /// list joined with `", "`.
    pub fn header_value(&self) -> String {
        match self {
            Accept::Single(media) => media.clone(),
            Accept::Many(list) => list.join(", "),
        }
    }
}

impl From<&str> for Accept {
    fn from(media: &str) -> Self {
        Accept::Single(media.to_string())
    }
}

impl From<String> for Accept {
    fn from(media: String) -> Self {
        Accept::Single(media)
    }
}

impl From<Vec<String>> for Accept {
    fn from(list: Vec<String>) -> Self {
        Accept::Many(list)
    }
}

impl From<Vec<&str>> for Accept {
    fn from(list: Vec<&str>) -> Self {
        Accept::Many(list.into_iter().map(String::from).collect())
    }
}

/// Scalar value of a path parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathValue {
    String(String),
    Number(serde_json::Number),
}

impl PathValue {
    /// Convert a JSON value into a path value.
    ///
    /// Only strings and numbers are scalars; anything else yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(PathValue::String(s.clone())),
            Value::Number(n) => Some(PathValue::Number(n.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for PathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathValue::String(s) => f.write_str(s),
            PathValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for PathValue {
    fn from(s: &str) -> Self {
        PathValue::String(s.to_string())
    }
}

impl From<String> for PathValue {
    fn from(s: String) -> Self {
        PathValue::String(s)
    }
}

macro_rules! path_value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PathValue {
                fn from(n: $t) -> Self {
                    PathValue::Number(n.into())
                }
            }
        )*
    };
}

path_value_from_int!(i32, i64, u32, u64, usize);

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    /// Body rendered as text, for diagnostics and dry runs.
    pub fn to_text(&self) -> String {
        match self {
            Body::Json(value) => value.to_string(),
            Body::Text(text) => text.clone(),
            Body::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Serializer turning a JSON body into its compact text form.
pub fn json_body_serializer() -> BodySerializer {
    Arc::new(|body| match body {
        Body::Json(value) => Body::Text(value.to_string()),
        other => other,
    })
}

/// Named moment in a request's life at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    OnRequest,
    OnRequestError,
    OnResponse,
    OnResponseError,
}

impl HookPoint {
    pub const ALL: [HookPoint; 4] = [
        HookPoint::OnRequest,
        HookPoint::OnRequestError,
        HookPoint::OnResponse,
        HookPoint::OnResponseError,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::OnRequest => "onRequest",
            HookPoint::OnRequestError => "onRequestError",
            HookPoint::OnResponse => "onResponse",
            HookPoint::OnResponseError => "onResponseError",
        }
    }

    /// Registry event for this point, optionally scoped to a client.
    ///
    /// `openFetch:onRequest` or `openFetch:onRequest:<client>`.
    pub fn event_name(&self, client: Option<&str>) -> String {
        match client {
            Some(client) => format!("{}:{}:{}", HOOK_NAMESPACE, self.name(), client),
            None => format!("{}:{}", HOOK_NAMESPACE, self.name()),
        }
    }
}
