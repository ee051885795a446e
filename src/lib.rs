//! Open Fetch
//!
//! Runtime request shaping for OpenAPI-generated HTTP clients.
//!
//! A call names a URL template such as `/pet/{petId}` and passes per-call
//! options. The client merges them over its base configuration, composes the
//! lifecycle hooks, serializes the body, normalizes headers, negotiates the
//! response media type, fills the path template and hands the result to a
//! transport.
//!
//! # Example
//!
//! ```
//! use open_fetch::{build_request, BaseConfig, HttpMethod, RequestConfig};
//!
//! let call = RequestConfig::new()
//!     .method(HttpMethod::Get)
//!     .path_param("petId", 1)
//!     .accept(vec!["application/json", "application/xml"]);
//!
//! let prepared = build_request("/pet/{petId}", &BaseConfig::default(), Some(call), None, None).unwrap();
//!
//! assert_eq!(prepared.url, "/pet/1");
//! assert_eq!(prepared.options.headers["accept"], "application/json, application/xml");
//! ```
//!
//! # Hook order
//!
//! | Order | Hook | Registry event |
//! |-------|------|----------------|
//! | 1 | global | `openFetch:onRequest` |
//! | 2 | client-scoped | `openFetch:onRequest:<client>` |
//! | 3 | configuration | - |
//!
//! The same applies to `onRequestError`, `onResponse` and `onResponseError`.

mod client;
mod config;
mod error;
mod headers;
mod hooks;
mod loader;
mod path;
#[cfg(feature = "remote")]
mod remote;
mod transport;
mod types;

pub use client::{build_request, OpenFetchClient, PreparedRequest};
pub use config::{BaseConfig, ConfigFactory, RequestConfig};
pub use error::{ConfigError, FetchError, HookError};
pub use headers::{apply_accept, build_header_map, parse_header_line, HeaderInit};
pub use hooks::{
    fill_path_interceptor, hook_fn, FetchContext, FetchHooks, Hook, HookDispatch, HookDispatchers,
    HookFn, HookPipeline, HookRegistry, RequestParts, ResponseInfo,
};
pub use loader::{load_config, load_config_str, ClientDefaults, ClientsConfig};
pub use path::{encode_component, fill_path, unresolved_placeholders};
pub use transport::{
    is_local_request, FetchResponse, ServerContext, Transport, TransportKind, TransportOptions,
    TransportSelector,
};
pub use types::{
    json_body_serializer, Accept, Body, BodySerializer, HookPoint, HttpMethod, PathParams,
    PathValue, QueryParams, HOOK_NAMESPACE,
};

#[cfg(feature = "remote")]
pub use remote::ReqwestTransport;
