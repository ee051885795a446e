//! Request building and the client surface.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{BaseConfig, RequestConfig};
use crate::error::FetchError;
use crate::headers::{apply_accept, build_header_map, HeaderInit};
use crate::hooks::{HookDispatch, HookDispatchers};
use crate::loader::ClientsConfig;
use crate::path::{fill_path, unresolved_placeholders};
use crate::transport::{FetchResponse, Transport, TransportKind, TransportOptions, TransportSelector};

/// Resolved URL plus transport options, ready to hand to a transport.
#[derive(Debug)]
pub struct PreparedRequest {
    pub url: String,
    pub options: TransportOptions,
}

/// Turn a URL template and configurations into a transport-ready request.
///
/// Steps, in order: merge `base` with `call`, compose hook dispatchers, run
/// the body serializer, fold the legacy `header` field into `headers`, build
/// the header map, apply `accept`, and substitute path parameters.
///
/// Unmatched `{name}` placeholders are left in the URL.
///
/// # Errors
///
/// Returns `FetchError::InvalidHeader` if a header name or value, including
/// the accept list, is not valid HTTP.
pub fn build_request(
    url_template: &str,
    base: &BaseConfig,
    call: Option<RequestConfig>,
    hooks: Option<&Arc<dyn HookDispatch>>,
    client: Option<&str>,
) -> Result<PreparedRequest, FetchError> {
    let mut config = base.resolve(call);

    let dispatchers = HookDispatchers::compose(hooks, client, &config.hooks);

    // Serializer must run before headers are built
    if let Some(serialize) = &config.body_serializer {
        config.body = config.body.take().map(|body| serialize(body));
    }

    if let Some(legacy) = config.header.take() {
        config.headers = Some(HeaderInit::Record(legacy));
    }

    let mut headers = build_header_map(config.headers.take())?;

    if let Some(accept) = config.accept.take() {
        apply_accept(&mut headers, &accept)?;
    }

    let url = fill_path(url_template, config.path.as_ref());

    Ok(PreparedRequest {
        url,
        options: TransportOptions {
            method: config.method,
            headers,
            body: config.body,
            path: config.path,
            query: config.query,
            base_url: config.base_url,
            timeout: config.timeout,
            retry: config.retry,
            extra: config.extra,
            hooks: dispatchers,
        },
    })
}

/// Callable client for one API.
///
/// ```no_run
/// # async fn run() -> Result<(), open_fetch::FetchError> {
/// use open_fetch::{OpenFetchClient, ReqwestTransport, RequestConfig};
/// use std::sync::Arc;
///
/// let base = RequestConfig::new().base_url("https://petstore3.swagger.io/api/v3");
/// let client = OpenFetchClient::new(base.into(), Arc::new(ReqwestTransport::new()?))
///     .with_name("pets");
///
/// let pet: serde_json::Value = client
///     .fetch_json("/pet/{petId}", Some(RequestConfig::new().path_param("petId", 1)))
///     .await?;
/// # let _ = pet;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct OpenFetchClient {
    name: Option<String>,
    base: BaseConfig,
    hooks: Option<Arc<dyn HookDispatch>>,
    transports: TransportSelector,
}

impl OpenFetchClient {
    pub fn new(base: BaseConfig, global: Arc<dyn Transport>) -> Self {
        Self {
            name: None,
            base,
            hooks: None,
            transports: TransportSelector::new(global),
        }
    }

    /// Client built from a named entry of a clients configuration.
    ///
    /// The entry becomes the static base configuration and the name selects
    /// client-scoped hooks.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownClient` if the name is not configured.
    pub fn from_config(
        config: &ClientsConfig,
        name: &str,
        global: Arc<dyn Transport>,
    ) -> Result<Self, crate::error::ConfigError> {
        let defaults = config.client(name)?;
        Ok(Self::new(BaseConfig::Static(defaults.to_request_config()), global).with_name(name))
    }

    /// Name used to select client-scoped hooks (`openFetch:<point>:<name>`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookDispatch>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_local_transport(mut self, local: Arc<dyn Transport>) -> Self {
        self.transports = self.transports.with_local(local);
        self
    }

    pub fn with_server_context<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.transports = self.transports.with_server_context(predicate);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Build the request without sending it.
    pub fn prepare(
        &self,
        url_template: &str,
        call: Option<RequestConfig>,
    ) -> Result<PreparedRequest, FetchError> {
        build_request(
            url_template,
            &self.base,
            call,
            self.hooks.as_ref(),
            self.name.as_deref(),
        )
    }

    /// Transport that a prepared request for `url_template` would use.
    pub fn transport_for(&self, url_template: &str, prepared: &PreparedRequest) -> TransportKind {
        self.transports
            .select(url_template, prepared.options.base_url.as_deref())
            .0
    }

    /// Build the request and hand it to the selected transport.
    ///
    /// Transport errors are returned as-is.
    pub async fn fetch(
        &self,
        url_template: &str,
        call: Option<RequestConfig>,
    ) -> Result<FetchResponse, FetchError> {
        let prepared = self.prepare(url_template, call)?;
        let (kind, transport) = self
            .transports
            .select(url_template, prepared.options.base_url.as_deref());

        let unresolved = unresolved_placeholders(&prepared.url);
        if !unresolved.is_empty() {
            debug!(url = %prepared.url, ?unresolved, "URL has unresolved path placeholders");
        }
        debug!(
            client = self.name.as_deref().unwrap_or("-"),
            url = %prepared.url,
            transport = ?kind,
            "dispatching request"
        );

        transport.fetch(&prepared.url, prepared.options).await
    }

    /// Like [`fetch`](Self::fetch), decoding the response body as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url_template: &str,
        call: Option<RequestConfig>,
    ) -> Result<T, FetchError> {
        self.fetch(url_template, call).await?.json()
    }
}

impl fmt::Debug for OpenFetchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFetchClient")
            .field("name", &self.name)
            .field("base", &self.base)
            .field("hooks", &self.hooks.is_some())
            .field("transports", &self.transports)
            .finish()
    }
}
