//! Error types for request shaping, transport and client configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a lifecycle hook callback.
///
/// A failing hook aborts the in-flight call.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors while shaping or performing a request.
#[derive(Debug, Error)]
pub enum FetchError {
    // Shaping errors (exit code 2)
    #[error("invalid header {name:?}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("hook {stage} failed: {source}")]
    Hook {
        stage: String,
        #[source]
        source: HookError,
    },

    // IO errors (exit code 3)
    #[cfg(feature = "remote")]
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("transport error: {message}")]
    Transport { message: String },

    // HTTP errors (exit code 1)
    #[error("{method} {url} returned status {status}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("cannot decode response body: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FetchError::Status { .. } => 1,
            #[cfg(feature = "remote")]
            FetchError::Network { .. } => 3,
            FetchError::Transport { .. } => 3,
            _ => 2,
        }
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            #[cfg(feature = "remote")]
            FetchError::Network { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors while loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown client \"{name}\": expected one of {}", known.join(", "))]
    UnknownClient { name: String, known: Vec<String> },

    #[error("invalid value at {path}: {message}")]
    InvalidValue { path: String, message: String },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::FileNotFound { .. } | ConfigError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}
