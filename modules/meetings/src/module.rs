use std::sync::Arc;

use accounts::contract::AccountsApi;
use async_trait::async_trait;
use modkit::{AuthGate, DbModule, Module, ModuleCtx, RestfulModule};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::MeetingsConfig;
use crate::contract::client::MeetingsApi;
use crate::domain::codes::RandomCodeGenerator;
use crate::domain::dates::DateNormalizer;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::MeetingsLocalClient;
use crate::infra::storage::sea_orm_repo::SeaOrmMeetingsRepository;
use crate::infra::user_directory::AccountsUserDirectory;

pub const MODULE_NAME: &str = "meetings";

/// Meetings and attendance. Depends on `accounts` for user lookups.
#[derive(Default)]
pub struct Meetings {
    service: arc_swap::ArcSwapOption<Service>,
}

impl Clone for Meetings {
    fn clone(&self) -> Self {
        Self {
            service: arc_swap::ArcSwapOption::new(self.service.load_full()),
        }
    }
}

#[async_trait]
impl Module for Meetings {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing meetings module");

        let cfg: MeetingsConfig = ctx.module_config()?;
        let tz = cfg.parse_timezone()?;
        debug!(timezone = tz.name(), max_code_attempts = cfg.max_code_attempts, "Loaded meetings config");

        let db = ctx.db_required()?;
        let accounts = ctx.client_hub().get::<dyn AccountsApi>()?;

        let service = Arc::new(Service::new(
            Arc::new(SeaOrmMeetingsRepository::new(db.sea())),
            Arc::new(AccountsUserDirectory::new(accounts)),
            Arc::new(RandomCodeGenerator),
            DateNormalizer::new(tz),
            ServiceConfig {
                max_code_attempts: cfg.max_code_attempts.max(1),
                ..ServiceConfig::default()
            },
        ));
        self.service.store(Some(service.clone()));

        let api: Arc<dyn MeetingsApi> = Arc::new(MeetingsLocalClient::new(service));
        ctx.client_hub().register::<dyn MeetingsApi>(api);
        info!("Meetings API exposed to ClientHub");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Meetings {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running meetings database migrations");
        crate::infra::storage::migrations::Migrator::up(db.seaorm(), None).await?;
        info!("Meetings database migrations completed");
        Ok(())
    }
}

impl RestfulModule for Meetings {
    fn register_rest(&self, ctx: &ModuleCtx, router: axum::Router) -> anyhow::Result<axum::Router> {
        info!("Registering meetings REST routes");
        let service = self
            .service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?;
        let gate = ctx.client_hub().get::<dyn AuthGate>()?;
        routes::register_routes(router, service, gate)
    }
}
