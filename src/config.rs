//! Request configuration and merging.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::headers::HeaderInit;
use crate::hooks::{FetchHooks, Hook};
use crate::types::{
    Accept, Body, BodySerializer, HookPoint, HttpMethod, PathParams, PathValue, QueryParams,
};

/// Options for one call, or defaults shared by many calls.
///
/// Every field is optional so that a base configuration and per-call
/// overrides can be merged key by key.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub method: Option<HttpMethod>,
    pub headers: Option<HeaderInit>,
    /// Legacy singular header field. Replaces `headers` when present.
    pub header: Option<IndexMap<String, String>>,
    pub path: Option<PathParams>,
    pub query: Option<QueryParams>,
    pub accept: Option<Accept>,
    pub body: Option<Body>,
    pub body_serializer: Option<BodySerializer>,
    pub hooks: FetchHooks,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub retry: Option<u32>,
    /// Transport-specific settings forwarded untouched.
    pub extra: Map<String, Value>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: keys set in `overrides` win.
    ///
    /// Hooks merge per lifecycle point and `extra` per key.
    pub fn merge(self, overrides: RequestConfig) -> RequestConfig {
        let mut extra = self.extra;
        extra.extend(overrides.extra);

        RequestConfig {
            method: overrides.method.or(self.method),
            headers: overrides.headers.or(self.headers),
            header: overrides.header.or(self.header),
            path: overrides.path.or(self.path),
            query: overrides.query.or(self.query),
            accept: overrides.accept.or(self.accept),
            body: overrides.body.or(self.body),
            body_serializer: overrides.body_serializer.or(self.body_serializer),
            hooks: self.hooks.merge(overrides.hooks),
            base_url: overrides.base_url.or(self.base_url),
            timeout: overrides.timeout.or(self.timeout),
            retry: overrides.retry.or(self.retry),
            extra,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn headers(mut self, headers: impl Into<HeaderInit>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    /// Add one path parameter.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<PathValue>) -> Self {
        self.path
            .get_or_insert_with(PathParams::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add one query parameter.
    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(QueryParams::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn accept(mut self, accept: impl Into<Accept>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(Body::Json(value))
    }

    pub fn body_serializer(mut self, serializer: BodySerializer) -> Self {
        self.body_serializer = Some(serializer);
        self
    }

    pub fn hook(mut self, point: HookPoint, hook: impl Into<Hook>) -> Self {
        self.hooks.set(point, hook);
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("header", &self.header)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("accept", &self.accept)
            .field("body", &self.body)
            .field("body_serializer", &self.body_serializer.as_ref().map(|_| ".."))
            .field("hooks", &self.hooks)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Factory producing the full configuration from the call-time configuration.
pub type ConfigFactory = Arc<dyn Fn(RequestConfig) -> RequestConfig + Send + Sync>;

/// Base configuration of a client.
#[derive(Clone)]
pub enum BaseConfig {
    /// Defaults shallow-merged under each call's overrides.
    Static(RequestConfig),
    /// Takes full responsibility for merging; its result is used as is.
    Factory(ConfigFactory),
}

impl BaseConfig {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(RequestConfig) -> RequestConfig + Send + Sync + 'static,
    {
        BaseConfig::Factory(Arc::new(f))
    }

    /// Produce the working configuration for one call.
    pub fn resolve(&self, call: Option<RequestConfig>) -> RequestConfig {
        match self {
            BaseConfig::Static(defaults) => match call {
                Some(call) => defaults.clone().merge(call),
                None => defaults.clone(),
            },
            BaseConfig::Factory(factory) => factory(call.unwrap_or_default()),
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig::Static(RequestConfig::default())
    }
}

impl From<RequestConfig> for BaseConfig {
    fn from(config: RequestConfig) -> Self {
        BaseConfig::Static(config)
    }
}

impl fmt::Debug for BaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseConfig::Static(config) => f.debug_tuple("Static").field(config).finish(),
            BaseConfig::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}
