//! Transport seam and transport selection.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::hooks::HookDispatchers;
use crate::types::{Body, HttpMethod, PathParams, QueryParams};

/// Fully resolved options handed to a transport.
///
/// There is no `accept`, legacy `header` or `body_serializer` here: those are
/// consumed while the request is built.
#[derive(Debug, Default)]
pub struct TransportOptions {
    pub method: Option<HttpMethod>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    /// Already substituted into the URL; unused by transports.
    pub path: Option<PathParams>,
    pub query: Option<QueryParams>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub retry: Option<u32>,
    pub extra: Map<String, Value>,
    pub hooks: HookDispatchers,
}

impl TransportOptions {
    /// Effective method; requests without one are GETs.
    pub fn method_or_default(&self) -> HttpMethod {
        self.method.unwrap_or_default()
    }
}

/// Response returned by a transport.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::Decode { source })
    }
}

/// Performs the HTTP exchange for a resolved request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, options: TransportOptions) -> Result<FetchResponse, FetchError>;
}

/// Reports whether the current execution context is server-side.
pub type ServerContext = Arc<dyn Fn() -> bool + Send + Sync>;

/// Which transport a request was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Local,
    Global,
}

/// Whether a request may bypass the network and use the local transport.
///
/// The URL must be a relative path, and the base URL must be absent, empty,
/// or itself relative.
pub fn is_local_request(url: &str, base_url: Option<&str>) -> bool {
    url.starts_with('/') && base_url.map_or(true, |base| base.is_empty() || base.starts_with('/'))
}

/// Chooses between the local and the global transport.
#[derive(Clone)]
pub struct TransportSelector {
    global: Arc<dyn Transport>,
    local: Option<Arc<dyn Transport>>,
    server_context: ServerContext,
}

impl TransportSelector {
    /// Selector with only a global transport.
    ///
    /// The server-context predicate defaults to `true`.
    pub fn new(global: Arc<dyn Transport>) -> Self {
        Self {
            global,
            local: None,
            server_context: Arc::new(|| true),
        }
    }

    pub fn with_local(mut self, local: Arc<dyn Transport>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn with_server_context<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.server_context = Arc::new(predicate);
        self
    }

    /// Pick the transport for a request.
    ///
    /// The local transport is used only in a server-side context, when one is
    /// configured, and when [`is_local_request`] holds.
    pub fn select(&self, url: &str, base_url: Option<&str>) -> (TransportKind, &Arc<dyn Transport>) {
        if let Some(local) = &self.local {
            if (self.server_context)() && is_local_request(url, base_url) {
                return (TransportKind::Local, local);
            }
        }
        (TransportKind::Global, &self.global)
    }
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSelector")
            .field("local", &self.local.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    #[async_trait]
    impl Transport for Stub {
        async fn fetch(&self, _url: &str, _options: TransportOptions) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse {
                status: 204,
                headers: HeaderMap::new(),
                body: Vec::new(),
            })
        }
    }

    fn selector(server: bool, with_local: bool) -> TransportSelector {
        let mut selector = TransportSelector::new(Arc::new(Stub)).with_server_context(move || server);
        if with_local {
            selector = selector.with_local(Arc::new(Stub));
        }
        selector
    }

    #[test]
    fn local_request_rules() {
        assert!(is_local_request("/api/pets", None));
        assert!(is_local_request("/api/pets", Some("")));
        assert!(is_local_request("/pets", Some("/api")));
        assert!(!is_local_request("/pets", Some("https://petstore.example")));
        assert!(!is_local_request("https://petstore.example/pets", None));
        assert!(!is_local_request("pets", None));
    }

    #[test]
    fn selects_local_on_server_for_relative() {
        let s = selector(true, true);
        assert_eq!(s.select("/api/pets", None).0, TransportKind::Local);
        assert_eq!(s.select("/pets", Some("/api")).0, TransportKind::Local);
    }

    #[test]
    fn selects_global_otherwise() {
        // Client-side context
        assert_eq!(selector(false, true).select("/api/pets", None).0, TransportKind::Global);
        // No local transport
        assert_eq!(selector(true, false).select("/api/pets", None).0, TransportKind::Global);
        // Absolute base URL
        assert_eq!(
            selector(true, true).select("/pets", Some("https://petstore.example")).0,
            TransportKind::Global
        );
        // Absolute URL
        assert_eq!(
            selector(true, true).select("https://petstore.example/pets", None).0,
            TransportKind::Global
        );
    }

    #[test]
    fn response_helpers() {
        let response = FetchResponse {
            status: 200,
            headers: HeaderMap::new(),
            body: br#"{"id":1,"name":"doggie"}"#.to_vec(),
        };
        assert!(response.is_success());
        let value: Value = response.json().unwrap();
        assert_eq!(value["name"], "doggie");

        let bad = FetchResponse {
            status: 500,
            headers: HeaderMap::new(),
            body: b"oops".to_vec(),
        };
        assert!(!bad.is_success());
        assert_eq!(bad.text(), "oops");
        assert!(matches!(bad.json::<Value>(), Err(FetchError::Decode { .. })));
    }
}
