use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::{middleware::from_fn, routing::get, Router};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub const MODULE_NAME: &str = "api_ingress";

const STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the HTTP server: hosts the router every REST module contributes to,
/// wraps it in the global middleware and serves it until cancelled.
pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    /// Used when the module config has no `bind_addr`.
    fallback_bind: String,
    final_router: Mutex<Option<Router>>,
    server: Mutex<Option<JoinHandle<anyhow::Result<()>>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new("127.0.0.1:8087")
    }
}

impl ApiIngress {
    pub fn new(fallback_bind: impl Into<String>) -> Self {
        Self {
            config: ArcSwap::from_pointee(ApiIngressConfig::default()),
            fallback_bind: fallback_bind.into(),
            final_router: Mutex::new(None),
            server: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let cfg = self.config.load();
        let raw = cfg.bind_addr.as_deref().unwrap_or(&self.fallback_bind);
        raw.parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", raw, e))
    }

    /// Address the server actually listens on; set once `start` has bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}

/// Global middleware. Each layer wraps everything added before it, so the
/// request-id layers end up outermost and the body limit innermost.
pub fn apply_middleware(mut router: Router, config: &ApiIngressConfig) -> Router {
    let x_request_id = request_id::header();

    // 1. Echo x-request-id back on the response
    router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));

    // 2. Generate x-request-id when missing
    router = router.layer(SetRequestIdLayer::new(
        x_request_id.clone(),
        request_id::MakeReqId,
    ));

    // 3. Put request_id into extensions and span
    router = router.layer(from_fn(request_id::push_req_id_to_extensions));

    // 4. Trace with request_id/status/latency
    router = router.layer(request_id::create_trace_layer());

    // 5. Per-request deadline
    router = router.layer(TimeoutLayer::new(Duration::from_secs(
        config.request_timeout_secs.max(1),
    )));

    // 6. CORS
    if config.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    // 7. Body limit
    router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
}

#[async_trait]
impl modkit::Module for ApiIngress {
    async fn init(&self, ctx: &modkit::ModuleCtx) -> anyhow::Result<()> {
        let cfg: ApiIngressConfig = ctx.module_config()?;
        self.config.store(Arc::new(cfg));
        let addr = self.bind_addr()?;
        tracing::debug!(module = MODULE_NAME, %addr, "Module initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// REST host role: prepare/finalize the router, but do not start the server here.
impl modkit::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> anyhow::Result<Router> {
        tracing::debug!("REST host prepared base router with health check");
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, router: Router) -> anyhow::Result<Router> {
        let router = apply_middleware(router, &self.get_config());
        *self.final_router.lock() = Some(router.clone());
        tracing::debug!("REST host finalized router");
        Ok(router)
    }
}

#[async_trait]
impl modkit::StatefulModule for ApiIngress {
    /// Binds before returning so address errors fail the start phase.
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let addr = self.bind_addr()?;
        let router = { self.final_router.lock().take() }.unwrap_or_else(|| {
            tracing::debug!("No router from REST phase, serving health only");
            apply_middleware(
                Router::new().route("/health", get(web::health_check)),
                &self.get_config(),
            )
        });

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let bound = listener.local_addr()?;
        *self.local_addr.lock() = Some(bound);
        tracing::info!("HTTP server bound on {}", bound);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
                .map_err(|e| anyhow::anyhow!(e))
        });
        *self.server.lock() = Some(handle);
        Ok(())
    }

    async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        let Some(handle) = self.server.lock().take() else {
            return Ok(());
        };
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(joined) => joined.context("HTTP server task panicked")?,
            Err(_) => {
                tracing::warn!("HTTP server did not drain within {:?}", STOP_TIMEOUT);
                Ok(())
            }
        }
    }
}
