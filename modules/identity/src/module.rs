use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::api::OpenApiRegistry;
use modkit::{DbModule, Module, ModuleCtx, RegistryBuilder, RestfulModule, TokenVerifier};
use rand::Rng;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::routes;
use crate::config::IdentityConfig;
use crate::contract::client::IdentityApi;
use crate::domain::ports::MailerPort;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::IdentityLocalClient;
use crate::infra::jwt::JwtCodec;
use crate::infra::mailer::{HttpRelayMailer, LogMailer};
use crate::infra::storage::{migrations::Migrator, SeaOrmUsersRepository};

pub const MODULE_NAME: &str = "identity";

const MAIL_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Users, credentials and bearer tokens. Publishes [`IdentityApi`] and the
/// [`TokenVerifier`] used by every guarded route.
#[derive(Default)]
pub struct Identity {
    service: ArcSwapOption<Service>,
    verifier: ArcSwapOption<JwtCodec>,
}

impl Identity {
    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("identity service not initialized"))
    }
}

fn signing_secret(cfg: &IdentityConfig) -> Vec<u8> {
    if !cfg.jwt_secret.is_empty() {
        return cfg.jwt_secret.as_bytes().to_vec();
    }
    warn!("identity.jwt_secret is empty; tokens will not survive a restart");
    let mut secret = vec![0u8; 32];
    rand::rng().fill(&mut secret[..]);
    secret
}

fn build_mailer(cfg: &IdentityConfig) -> anyhow::Result<Arc<dyn MailerPort>> {
    match cfg.mail_relay_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => {
            let client = reqwest::Client::builder()
                .timeout(MAIL_RELAY_TIMEOUT)
                .build()?;
            info!(relay = url, "mail relay configured");
            Ok(Arc::new(HttpRelayMailer::new(client, url, cfg.mail_from.clone())))
        }
        None => Ok(Arc::new(LogMailer)),
    }
}

#[async_trait]
impl Module for Identity {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: IdentityConfig = ctx.module_config()?;
        debug!(
            token_ttl = ?cfg.token_ttl,
            reset_token_ttl = ?cfg.reset_token_ttl,
            "identity configured"
        );

        let db = ctx.db_required()?;
        let codec = Arc::new(JwtCodec::new(&signing_secret(&cfg), cfg.token_ttl));
        let service = Arc::new(Service::new(
            Arc::new(SeaOrmUsersRepository::new(db.sea())),
            build_mailer(&cfg)?,
            codec.clone(),
            ServiceConfig {
                password_iterations: cfg.password_iterations,
                reset_token_ttl: cfg.reset_token_ttl,
                frontend_url: cfg.frontend_url.clone(),
            },
        ));

        let hub = ctx.client_hub();
        hub.register::<dyn IdentityApi>(Arc::new(IdentityLocalClient::new(service.clone())));
        hub.register::<dyn TokenVerifier>(codec.clone());

        self.service.store(Some(service));
        self.verifier.store(Some(codec));
        info!("identity clients published");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Identity {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        Migrator::up(db.seaorm(), None).await?;
        debug!("identity migrations applied");
        Ok(())
    }
}

impl RestfulModule for Identity {
    fn register_rest(
        &self,
        _ctx: &ModuleCtx,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        let verifier: Arc<dyn TokenVerifier> = self
            .verifier
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("identity verifier not initialized"))?;
        routes::register_routes(router, openapi, self.service()?, verifier)
    }
}

pub fn register(builder: &mut RegistryBuilder) -> Arc<Identity> {
    let module = Arc::new(Identity::default());
    builder
        .module(MODULE_NAME, &[], module.clone())
        .db(module.clone())
        .rest(module.clone());
    module
}
