use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use modkit::{AuthGate, DbModule, Module, ModuleCtx, RestfulModule};
use rand::RngCore;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::routes;
use crate::config::{AccountsConfig, BootstrapAdmin};
use crate::contract::client::AccountsApi;
use crate::contract::model::NewUser;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::{auth_gate::AccountsAuthGate, local::AccountsLocalClient};
use crate::infra::jwt::JwtIssuer;
use crate::infra::password::Argon2Hasher;
use crate::infra::storage::sea_orm_repo::SeaOrmUsersRepository;

pub const MODULE_NAME: &str = "accounts";

/// Identity store and token authority.
#[derive(Default)]
pub struct Accounts {
    service: arc_swap::ArcSwapOption<Service>,
    bootstrap: arc_swap::ArcSwapOption<BootstrapAdmin>,
}

impl Clone for Accounts {
    fn clone(&self) -> Self {
        Self {
            service: arc_swap::ArcSwapOption::new(self.service.load_full()),
            bootstrap: arc_swap::ArcSwapOption::new(self.bootstrap.load_full()),
        }
    }
}

impl Accounts {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }
}

fn signing_secret(cfg: &AccountsConfig) -> Vec<u8> {
    if !cfg.jwt_secret.is_empty() {
        return cfg.jwt_secret.as_bytes().to_vec();
    }
    warn!("accounts.jwt_secret is not set; tokens will not survive a restart");
    let mut raw = [0u8; 32];
    rand::rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw).into_bytes()
}

#[async_trait]
impl Module for Accounts {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing accounts module");

        let cfg: AccountsConfig = ctx.module_config()?;
        debug!(
            token_ttl_secs = cfg.token_ttl_secs,
            bootstrap_admin = cfg.bootstrap_admin.is_some(),
            "Loaded accounts config"
        );

        let db = ctx.db_required()?;
        let repo = SeaOrmUsersRepository::new(db.sea());
        let service_config = ServiceConfig {
            token_ttl: chrono::Duration::seconds(i64::try_from(cfg.token_ttl_secs)?),
            ..ServiceConfig::default()
        };
        let service = Arc::new(Service::new(
            Arc::new(repo),
            Arc::new(Argon2Hasher::default()),
            Arc::new(JwtIssuer::new(&signing_secret(&cfg))),
            service_config,
        ));

        self.service.store(Some(service.clone()));
        self.bootstrap.store(cfg.bootstrap_admin.map(Arc::new));

        let hub = ctx.client_hub();
        let api: Arc<dyn AccountsApi> = Arc::new(AccountsLocalClient::new(service.clone()));
        hub.register::<dyn AccountsApi>(api);
        let gate: Arc<dyn AuthGate> = Arc::new(AccountsAuthGate::new(service));
        hub.register::<dyn AuthGate>(gate);
        info!("Accounts API and auth gate exposed to ClientHub");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Accounts {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running accounts database migrations");
        crate::infra::storage::migrations::Migrator::up(db.seaorm(), None).await?;

        if let Some(admin) = self.bootstrap.load_full() {
            let created = self
                .service()?
                .ensure_admin(NewUser {
                    username: admin.username.clone(),
                    email: admin.email.clone(),
                    password: admin.password.clone(),
                })
                .await?;
            if created.is_none() {
                debug!("Bootstrap admin already present");
            }
        }
        info!("Accounts database ready");
        Ok(())
    }
}

impl RestfulModule for Accounts {
    fn register_rest(&self, ctx: &ModuleCtx, router: axum::Router) -> anyhow::Result<axum::Router> {
        info!("Registering accounts REST routes");
        let gate = ctx.client_hub().get::<dyn AuthGate>()?;
        routes::register_routes(router, self.service()?, gate)
    }
}
