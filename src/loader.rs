//! Client configuration loading.
//!
//! A configuration file holds module-level defaults per named client:
//!
//! ```json
//! {
//!   "clients": {
//!     "pets": {
//!       "baseURL": "https://petstore3.swagger.io/api/v3",
//!       "headers": { "X-Api-Key": "secret" },
//!       "timeout": 5000
//!     }
//!   }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::RequestConfig;
use crate::error::ConfigError;
use crate::headers::HeaderInit;
use crate::types::{Accept, HttpMethod, QueryParams};

/// Defaults of one named client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDefaults {
    #[serde(alias = "baseURL")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    pub query: Option<QueryParams>,
    pub method: Option<HttpMethod>,
    pub accept: Option<Accept>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub retry: Option<u32>,
    /// Anything else, forwarded to the transport.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClientDefaults {
    pub fn to_request_config(&self) -> RequestConfig {
        RequestConfig {
            method: self.method,
            headers: (!self.headers.is_empty()).then(|| HeaderInit::Record(self.headers.clone())),
            query: self.query.clone(),
            accept: self.accept.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout.map(Duration::from_millis),
            retry: self.retry,
            extra: self.extra.clone(),
            ..RequestConfig::default()
        }
    }
}

/// Defaults for every named client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClientsConfig {
    #[serde(default)]
    pub clients: IndexMap<String, ClientDefaults>,
}

impl ClientsConfig {
    /// Look up a client by name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownClient` if no client has that name.
    pub fn client(&self, name: &str) -> Result<&ClientDefaults, ConfigError> {
        self.clients
            .get(name)
            .ok_or_else(|| ConfigError::UnknownClient {
                name: name.to_string(),
                known: self.clients.keys().cloned().collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }
}

/// Load client configuration from a file path.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if the file doesn't exist,
/// or `ConfigError::InvalidJson` if the file isn't a valid configuration.
pub fn load_config(path: &Path) -> Result<ClientsConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_config_str(&content)
}

/// Load client configuration from a JSON string.
///
/// # Errors
///
/// Returns `ConfigError::InvalidJson` if the string isn't a valid configuration,
/// or `ConfigError::InvalidValue` if a client's base URL is empty.
pub fn load_config_str(content: &str) -> Result<ClientsConfig, ConfigError> {
    let config: ClientsConfig =
        serde_json::from_str(content).map_err(|source| ConfigError::InvalidJson { source })?;

    for (name, client) in &config.clients {
        if client.base_url.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                path: format!("/clients/{}/baseURL", name),
                message: "must not be empty".into(),
            });
        }
    }

    Ok(config)
}
