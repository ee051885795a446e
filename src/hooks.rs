//! Lifecycle hooks.
//!
//! Three sources of hooks can apply to a lifecycle point of one call:
//!
//! | Order | Source | Registry event |
//! |-------|--------|----------------|
//! | 1 | global registry hook | `openFetch:<point>` |
//! | 2 | client-scoped registry hook | `openFetch:<point>:<client>` |
//! | 3 | hook carried in the request configuration | - |
//!
//! A [`HookPipeline`] holds these stages for one point and runs them in order,
//! awaiting each before the next starts.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use http::header::HeaderMap;

use crate::error::{FetchError, HookError};
use crate::headers::parse_header;
use crate::path::fill_path;
use crate::types::{HookPoint, HttpMethod, PathParams};

/// Shared async hook callback.
pub type HookFn = Arc<dyn Fn(FetchContext) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

/// Wrap an async closure as a [`HookFn`].
pub fn hook_fn<F, Fut>(f: F) -> HookFn
where
    F: Fn(FetchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// A hook: one callback, or a list whose entries run concurrently.
#[derive(Clone)]
pub enum Hook {
    Single(HookFn),
    Many(Vec<HookFn>),
}

impl Hook {
    /// Run the hook.
    ///
    /// List entries are started together and all of them are awaited. The
    /// first error in list order is returned.
    pub async fn call(&self, ctx: &FetchContext) -> Result<(), HookError> {
        match self {
            Hook::Single(f) => f(ctx.clone()).await,
            Hook::Many(list) => join_all(list.iter().map(|f| f(ctx.clone())))
                .await
                .into_iter()
                .collect(),
        }
    }
}

impl From<HookFn> for Hook {
    fn from(f: HookFn) -> Self {
        Hook::Single(f)
    }
}

impl From<Vec<HookFn>> for Hook {
    fn from(list: Vec<HookFn>) -> Self {
        Hook::Many(list)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Single(_) => f.write_str("Hook::Single(..)"),
            Hook::Many(list) => write!(f, "Hook::Many({} callbacks)", list.len()),
        }
    }
}

/// Per-configuration hooks, one optional slot per lifecycle point.
#[derive(Debug, Clone, Default)]
pub struct FetchHooks {
    pub on_request: Option<Hook>,
    pub on_request_error: Option<Hook>,
    pub on_response: Option<Hook>,
    pub on_response_error: Option<Hook>,
}

impl FetchHooks {
    pub fn get(&self, point: HookPoint) -> Option<&Hook> {
        match point {
            HookPoint::OnRequest => self.on_request.as_ref(),
            HookPoint::OnRequestError => self.on_request_error.as_ref(),
            HookPoint::OnResponse => self.on_response.as_ref(),
            HookPoint::OnResponseError => self.on_response_error.as_ref(),
        }
    }

    pub fn set(&mut self, point: HookPoint, hook: impl Into<Hook>) {
        let slot = match point {
            HookPoint::OnRequest => &mut self.on_request,
            HookPoint::OnRequestError => &mut self.on_request_error,
            HookPoint::OnResponse => &mut self.on_response,
            HookPoint::OnResponseError => &mut self.on_response_error,
        };
        *slot = Some(hook.into());
    }

    /// Shallow merge: each point set in `overrides` wins.
    pub fn merge(self, overrides: FetchHooks) -> FetchHooks {
        FetchHooks {
            on_request: overrides.on_request.or(self.on_request),
            on_request_error: overrides.on_request_error.or(self.on_request_error),
            on_response: overrides.on_response.or(self.on_response),
            on_response_error: overrides.on_response_error.or(self.on_response_error),
        }
    }

    pub fn is_empty(&self) -> bool {
        HookPoint::ALL.iter().all(|p| self.get(*p).is_none())
    }
}

/// Mutable parts of the outgoing request, shared by hooks of one call.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub url: String,
    pub headers: HeaderMap,
    pub path: Option<PathParams>,
}

/// Response summary visible to response hooks.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    pub headers: HeaderMap,
}

/// Context handed to every hook callback.
///
/// Clones share the same [`RequestParts`], so changes made by an `onRequest`
/// hook are seen by later stages and by the transport.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub point: HookPoint,
    pub method: HttpMethod,
    pub response: Option<ResponseInfo>,
    pub error: Option<Arc<str>>,
    request: Arc<Mutex<RequestParts>>,
}

impl FetchContext {
    pub fn new(method: HttpMethod, parts: RequestParts) -> Self {
        Self {
            point: HookPoint::OnRequest,
            method,
            response: None,
            error: None,
            request: Arc::new(Mutex::new(parts)),
        }
    }

    /// Same request, viewed from another lifecycle point.
    pub fn at(&self, point: HookPoint) -> Self {
        Self {
            point,
            ..self.clone()
        }
    }

    pub fn with_response(mut self, response: ResponseInfo) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(Arc::from(error.to_string()));
        self
    }

    fn lock(&self) -> MutexGuard<'_, RequestParts> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.lock().url = url.into();
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    pub fn set_header(&self, name: &str, value: &str) -> Result<(), HookError> {
        let (name, value) = parse_header(name, value).map_err(|e| HookError::new(e.to_string()))?;
        self.lock().headers.insert(name, value);
        Ok(())
    }

    /// Snapshot of the request parts.
    pub fn parts(&self) -> RequestParts {
        self.lock().clone()
    }

    /// Run a closure with exclusive access to the request parts.
    pub fn with_parts<R>(&self, f: impl FnOnce(&mut RequestParts) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Hook registry collaborator.
#[async_trait]
pub trait HookDispatch: Send + Sync {
    /// Run every callback registered for `event`.
    async fn call_hook(&self, event: &str, ctx: FetchContext) -> Result<(), HookError>;
}

/// In-memory hook registry.
///
/// Callbacks registered for the same event run one after another in
/// registration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Vec<HookFn>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event such as `openFetch:onRequest:pets`.
    pub fn hook(&self, event: impl Into<String>, f: HookFn) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.into())
            .or_default()
            .push(f);
    }

    /// Register a callback for a lifecycle point, optionally client-scoped.
    pub fn on(&self, point: HookPoint, client: Option<&str>, f: HookFn) {
        self.hook(point.event_name(client), f);
    }

    pub fn has_hooks(&self, event: &str) -> bool {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .is_some_and(|list| !list.is_empty())
    }

    fn callbacks(&self, event: &str) -> Vec<HookFn> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner);
        let mut events: Vec<_> = hooks.keys().collect();
        events.sort();
        f.debug_struct("HookRegistry").field("events", &events).finish()
    }
}

#[async_trait]
impl HookDispatch for HookRegistry {
    async fn call_hook(&self, event: &str, ctx: FetchContext) -> Result<(), HookError> {
        for callback in self.callbacks(event) {
            callback(ctx.clone()).await?;
        }
        Ok(())
    }
}

enum Stage {
    Registry {
        dispatch: Arc<dyn HookDispatch>,
        event: String,
    },
    Config(Hook),
}

impl Stage {
    fn label(&self, point: HookPoint) -> String {
        match self {
            Stage::Registry { event, .. } => event.clone(),
            Stage::Config(_) => point.name().to_string(),
        }
    }
}

/// Ordered hook stages for one lifecycle point of one call.
pub struct HookPipeline {
    point: HookPoint,
    stages: Vec<Stage>,
}

impl HookPipeline {
    /// Build the stages for `point`: global registry event, client-scoped
    /// registry event when `client` is set, then the configuration hook.
    pub fn build(
        point: HookPoint,
        registry: Option<&Arc<dyn HookDispatch>>,
        client: Option<&str>,
        config: &FetchHooks,
    ) -> Self {
        let mut stages = Vec::with_capacity(3);
        if let Some(dispatch) = registry {
            stages.push(Stage::Registry {
                dispatch: Arc::clone(dispatch),
                event: point.event_name(None),
            });
            if let Some(client) = client {
                stages.push(Stage::Registry {
                    dispatch: Arc::clone(dispatch),
                    event: point.event_name(Some(client)),
                });
            }
        }
        if let Some(hook) = config.get(point) {
            stages.push(Stage::Config(hook.clone()));
        }
        Self { point, stages }
    }

    pub fn point(&self) -> HookPoint {
        self.point
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage labels in execution order.
    pub fn stage_labels(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.label(self.point)).collect()
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Hook` naming the first failing stage; later
    /// stages do not run.
    pub async fn run(&self, ctx: &FetchContext) -> Result<(), FetchError> {
        let ctx = ctx.at(self.point);
        for stage in &self.stages {
            let result = match stage {
                Stage::Registry { dispatch, event } => dispatch.call_hook(event, ctx.clone()).await,
                Stage::Config(hook) => hook.call(&ctx).await,
            };
            result.map_err(|source| FetchError::Hook {
                stage: stage.label(self.point),
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("point", &self.point)
            .field("stages", &self.stage_labels())
            .finish()
    }
}

/// Dispatchers for all four lifecycle points of one call.
#[derive(Debug)]
pub struct HookDispatchers {
    pipelines: [HookPipeline; 4],
}

impl HookDispatchers {
    /// Compose dispatchers from the registry, client name and configuration hooks.
    pub fn compose(
        registry: Option<&Arc<dyn HookDispatch>>,
        client: Option<&str>,
        config: &FetchHooks,
    ) -> Self {
        Self {
            pipelines: HookPoint::ALL.map(|p| HookPipeline::build(p, registry, client, config)),
        }
    }

    /// Dispatchers with no stages.
    pub fn empty() -> Self {
        Self::compose(None, None, &FetchHooks::default())
    }

    pub fn get(&self, point: HookPoint) -> &HookPipeline {
        let idx = match point {
            HookPoint::OnRequest => 0,
            HookPoint::OnRequestError => 1,
            HookPoint::OnResponse => 2,
            HookPoint::OnResponseError => 3,
        };
        &self.pipelines[idx]
    }

    pub async fn dispatch(&self, point: HookPoint, ctx: &FetchContext) -> Result<(), FetchError> {
        self.get(point).run(ctx).await
    }
}

impl Default for HookDispatchers {
    fn default() -> Self {
        Self::empty()
    }
}

/// `onRequest` hook that substitutes path placeholders in the context URL
/// from the context path parameters.
pub fn fill_path_interceptor() -> HookFn {
    hook_fn(|ctx: FetchContext| async move {
        ctx.with_parts(|parts| {
            parts.url = fill_path(&parts.url, parts.path.as_ref());
        });
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathValue;
    use std::time::Duration;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> HookFn {
        let log = Arc::clone(log);
        hook_fn(move |_ctx| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(label.to_string());
                Ok(())
            }
        })
    }

    fn ctx() -> FetchContext {
        FetchContext::new(
            HttpMethod::Get,
            RequestParts {
                url: "/pet/1".into(),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn pipeline_runs_global_client_config_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HookRegistry::new();
        // Registered out of order on purpose
        registry.on(HookPoint::OnRequest, Some("pets"), recorder(&log, "pets"));
        registry.on(HookPoint::OnRequest, None, recorder(&log, "global"));
        registry.on(HookPoint::OnRequest, Some("store"), recorder(&log, "store"));
        let registry: Arc<dyn HookDispatch> = Arc::new(registry);

        let mut config = FetchHooks::default();
        config.set(HookPoint::OnRequest, recorder(&log, "config"));

        let pipeline = HookPipeline::build(HookPoint::OnRequest, Some(&registry), Some("pets"), &config);
        assert_eq!(
            pipeline.stage_labels(),
            vec!["openFetch:onRequest", "openFetch:onRequest:pets", "onRequest"]
        );

        pipeline.run(&ctx()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["global", "pets", "config"]);
    }

    #[tokio::test]
    async fn pipeline_without_registry_runs_config_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut config = FetchHooks::default();
        config.set(HookPoint::OnResponse, recorder(&log, "config"));

        let dispatchers = HookDispatchers::compose(None, Some("pets"), &config);
        assert!(dispatchers.get(HookPoint::OnRequest).is_empty());
        assert_eq!(
            dispatchers.get(HookPoint::OnResponse).stage_labels(),
            vec!["onResponse"]
        );

        dispatchers.dispatch(HookPoint::OnResponse, &ctx()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["config"]);
    }

    #[tokio::test]
    async fn list_hook_entries_run_concurrently() {
        let (tx_a, rx_a) = tokio::sync::oneshot::channel::<()>();
        let (tx_b, rx_b) = tokio::sync::oneshot::channel::<()>();
        let tx_a = Arc::new(Mutex::new(Some(tx_a)));
        let rx_b = Arc::new(Mutex::new(Some(rx_b)));
        let tx_b = Arc::new(Mutex::new(Some(tx_b)));
        let rx_a = Arc::new(Mutex::new(Some(rx_a)));

        // Each entry waits for the other; only completes if both are polled together
        let first = hook_fn(move |_ctx| {
            let tx = tx_a.lock().unwrap().take();
            let rx = rx_b.lock().unwrap().take();
            async move {
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
                if let Some(rx) = rx {
                    rx.await.map_err(|e| HookError::new(e.to_string()))?;
                }
                Ok(())
            }
        });
        let second = hook_fn(move |_ctx| {
            let tx = tx_b.lock().unwrap().take();
            let rx = rx_a.lock().unwrap().take();
            async move {
                if let Some(rx) = rx {
                    rx.await.map_err(|e| HookError::new(e.to_string()))?;
                }
                if let Some(tx) = tx {
                    let _ = tx.send(());
                }
                Ok(())
            }
        });

        let hook = Hook::Many(vec![first, second]);
        tokio::time::timeout(Duration::from_secs(1), hook.call(&ctx()))
            .await
            .expect("list entries should not run sequentially")
            .unwrap();
    }

    #[tokio::test]
    async fn list_hook_waits_for_all_and_reports_first_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = hook_fn(|_ctx| async { Err(HookError::new("boom")) });
        let slow = {
            let log = Arc::clone(&log);
            hook_fn(move |_ctx| {
                let log = Arc::clone(&log);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    log.lock().unwrap().push("slow done".to_string());
                    Ok(())
                }
            })
        };

        let err = Hook::Many(vec![failing, slow]).call(&ctx()).await.unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(*log.lock().unwrap(), vec!["slow done"]);
    }

    #[tokio::test]
    async fn failing_stage_stops_pipeline() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HookRegistry::new();
        registry.on(
            HookPoint::OnRequest,
            None,
            hook_fn(|_ctx| async { Err(HookError::new("denied")) }),
        );
        let registry: Arc<dyn HookDispatch> = Arc::new(registry);
        let mut config = FetchHooks::default();
        config.set(HookPoint::OnRequest, recorder(&log, "config"));

        let pipeline = HookPipeline::build(HookPoint::OnRequest, Some(&registry), None, &config);
        let err = pipeline.run(&ctx()).await.unwrap_err();
        assert!(matches!(err, FetchError::Hook { ref stage, .. } if stage == "openFetch:onRequest"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hooks_share_request_parts() {
        let set = hook_fn(|ctx: FetchContext| async move { ctx.set_header("authorization", "Bearer t") });
        let c = ctx();
        Hook::Single(set).call(&c).await.unwrap();
        assert_eq!(c.header("authorization").as_deref(), Some("Bearer t"));
    }

    #[tokio::test]
    async fn context_carries_point() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_hook = Arc::clone(&seen);
        let mut config = FetchHooks::default();
        config.set(
            HookPoint::OnResponseError,
            hook_fn(move |ctx: FetchContext| {
                let seen = Arc::clone(&seen_in_hook);
                async move {
                    *seen.lock().unwrap() = Some(ctx.point);
                    Ok(())
                }
            }),
        );
        let dispatchers = HookDispatchers::compose(None, None, &config);
        dispatchers.dispatch(HookPoint::OnResponseError, &ctx()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(HookPoint::OnResponseError));
    }

    #[tokio::test]
    async fn interceptor_fills_context_url() {
        let mut path = PathParams::new();
        path.insert("petId".into(), PathValue::from(9));
        let c = FetchContext::new(
            HttpMethod::Get,
            RequestParts {
                url: "/pet/{petId}".into(),
                path: Some(path),
                ..Default::default()
            },
        );
        Hook::Single(fill_path_interceptor()).call(&c).await.unwrap();
        assert_eq!(c.url(), "/pet/9");
    }

    #[test]
    fn merge_prefers_overrides_per_point() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut base = FetchHooks::default();
        base.set(HookPoint::OnRequest, recorder(&log, "base-request"));
        base.set(HookPoint::OnResponse, recorder(&log, "base-response"));
        let mut call = FetchHooks::default();
        call.set(HookPoint::OnRequest, Hook::Many(vec![recorder(&log, "call")]));

        let merged = base.merge(call);
        assert!(matches!(merged.on_request, Some(Hook::Many(_))));
        assert!(matches!(merged.on_response, Some(Hook::Single(_))));
        assert!(merged.on_request_error.is_none());
    }
}
