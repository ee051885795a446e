//! HTTP transport backed by `reqwest`.
//!
//! Requires the `remote` feature (enabled by default).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::hooks::{FetchContext, RequestParts, ResponseInfo};
use crate::transport::{FetchResponse, Transport, TransportOptions};
use crate::types::{Body, HookPoint, QueryParams};

/// Default timeout for HTTP requests (30 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Statuses worth retrying when `retry` is set.
const RETRY_STATUSES: &[u16] = &[408, 409, 425, 429, 500, 502, 503, 504];

/// Transport performing real HTTP calls.
///
/// With an origin configured, relative URLs are resolved against it; this is
/// how a local transport reaches the application's own API routes.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    origin: Option<String>,
}

impl ReqwestTransport {
    /// Transport for absolute URLs.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            origin: None,
        }
    }

    /// Resolve relative URLs against `origin` (e.g. `http://127.0.0.1:3000`).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Join the request URL with the base URL and, for relative results,
    /// with the configured origin.
    pub fn resolve_url(&self, url: &str, base_url: Option<&str>) -> Result<reqwest::Url, FetchError> {
        let joined = match base_url {
            Some(base) if !base.is_empty() && !has_protocol(url) => join_url(base, url),
            _ => url.to_string(),
        };

        let absolute = if has_protocol(&joined) {
            joined
        } else if let Some(origin) = &self.origin {
            join_url(origin, &joined)
        } else {
            return Err(FetchError::InvalidUrl {
                url: joined,
                message: "relative URL without base URL or origin".into(),
            });
        };

        reqwest::Url::parse(&absolute).map_err(|e| FetchError::InvalidUrl {
            url: absolute.clone(),
            message: e.to_string(),
        })
    }

    async fn attempt(
        &self,
        ctx: &FetchContext,
        options: &TransportOptions,
    ) -> Result<FetchResponse, FetchError> {
        options.hooks.dispatch(HookPoint::OnRequest, ctx).await?;

        // Hooks may have rewritten the URL and headers
        let RequestParts { url, headers, .. } = ctx.parts();
        let target = self.resolve_url(&url, options.base_url.as_deref())?;
        let method = options.method_or_default();

        let mut request = self
            .client
            .request(method.to_http(), target.clone())
            .headers(headers);
        if let Some(query) = &options.query {
            request = request.query(&query_pairs(query));
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        request = match &options.body {
            Some(Body::Json(value)) => request.json(value),
            Some(Body::Text(text)) => request.body(text.clone()),
            Some(Body::Bytes(bytes)) => request.body(bytes.clone()),
            None => request,
        };

        debug!(%method, url = %target, "sending request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                let err_ctx = ctx.at(HookPoint::OnRequestError).with_error(&source);
                options
                    .hooks
                    .dispatch(HookPoint::OnRequestError, &err_ctx)
                    .await?;
                return Err(FetchError::Network {
                    url: target.to_string(),
                    source,
                });
            }
        };

        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Network {
                url: target.to_string(),
                source,
            })?
            .to_vec();

        let info = ResponseInfo {
            status,
            headers: response_headers.clone(),
        };
        let res_ctx = ctx.at(HookPoint::OnResponse).with_response(info);
        options.hooks.dispatch(HookPoint::OnResponse, &res_ctx).await?;

        let fetched = FetchResponse {
            status,
            headers: response_headers,
            body,
        };
        if fetched.is_success() {
            return Ok(fetched);
        }

        options
            .hooks
            .dispatch(HookPoint::OnResponseError, &res_ctx)
            .await?;
        Err(FetchError::Status {
            method: method.as_str().to_uppercase(),
            url: target.to_string(),
            status,
            body: fetched.text(),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &str, options: TransportOptions) -> Result<FetchResponse, FetchError> {
        let ctx = FetchContext::new(
            options.method_or_default(),
            RequestParts {
                url: url.to_string(),
                headers: options.headers.clone(),
                path: options.path.clone(),
            },
        );

        let retries = options.retry.unwrap_or(0);
        let mut attempt = 0;
        loop {
            match self.attempt(&ctx, &options).await {
                Err(err) if attempt < retries && is_retryable(&err) => {
                    attempt += 1;
                    warn!(error = %err, attempt, retries, "retrying request");
                }
                result => return result,
            }
        }
    }
}

fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Network { .. } => true,
        FetchError::Status { status, .. } => RETRY_STATUSES.contains(status),
        _ => false,
    }
}

fn has_protocol(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Join two URL segments with exactly one `/` between them.
fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() || path == "/" {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Flatten query values: arrays repeat the key, nulls are dropped.
fn query_pairs(query: &QueryParams) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(query.len());
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(item) = query_scalar(item) {
                        pairs.push((key.clone(), item));
                    }
                }
            }
            other => {
                if let Some(item) = query_scalar(other) {
                    pairs.push((key.clone(), item));
                }
            }
        }
    }
    pairs
}

fn query_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
