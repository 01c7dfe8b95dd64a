//! Drives a registry through its phases.
//!
//! One base [`ModuleCtx`](crate::ModuleCtx) is built up front and reused by
//! every phase (init → db → rest → start → wait → stop). Shutdown is driven by
//! OS signals, an external `CancellationToken`, or an arbitrary future.

use crate::context::{ConfigProvider, ModuleCtxBuilder};
use crate::registry::RegistryBuilder;
use crate::runtime::shutdown;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// How the runtime provides a database to modules.
pub enum DbOptions {
    /// `ModuleCtx::db()` is `None`; the DB phase is skipped.
    None,
    /// A handle opened by the caller, shared by every module.
    Existing(Arc<modkit_db::DbHandle>),
}

/// How the runtime decides when to stop.
pub enum ShutdownOptions {
    /// Ctrl+C / SIGTERM.
    Signals,
    /// An external token controls the lifecycle.
    Token(CancellationToken),
    /// Shutdown starts when the future completes.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    /// Modules to run, explicitly registered by the binary.
    pub modules: RegistryBuilder,
    /// Provider of module config sections (raw JSON by module name).
    pub modules_cfg: Arc<dyn ConfigProvider>,
    pub db: DbOptions,
    pub shutdown: ShutdownOptions,
}

/// Full cycle: init → db → rest (sync) → start → wait → stop.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown().await {
                    Ok(()) => tracing::info!("shutdown: signal received"),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "shutdown: primary waiter failed; falling back to ctrl_c()"
                        );
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let registry = opts.modules.build()?;

    let mut ctx_builder = ModuleCtxBuilder::new(cancel.clone())
        .with_client_hub(Arc::new(crate::client_hub::ClientHub::new()))
        .with_config_provider(opts.modules_cfg.clone());
    if let DbOptions::Existing(db) = &opts.db {
        ctx_builder = ctx_builder.with_db(db.clone());
    }
    let base_ctx = ctx_builder.build();

    tracing::info!("Phase: init");
    registry.run_init_phase(&base_ctx).await?;

    if let DbOptions::Existing(db) = &opts.db {
        tracing::info!("Phase: db");
        registry.run_db_phase(db).await?;
    }

    tracing::info!("Phase: rest (sync)");
    let _ = registry.run_rest_phase(&base_ctx, axum::Router::new())?;

    tracing::info!("Phase: start");
    if let Err(e) = registry.run_start_phase(cancel.clone()).await {
        // Modules started before the failure still get their stop call.
        cancel.cancel();
        registry.run_stop_phase(cancel).await;
        return Err(e.into());
    }

    cancel.cancelled().await;

    tracing::info!("Phase: stop");
    registry.run_stop_phase(cancel).await;
    Ok(())
}
