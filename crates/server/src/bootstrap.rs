use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tracing::{info, warn};

use cotiza_core::config::{AppConfig, ConfigError, LoadOptions};
use cotiza_db::repositories::{
    SqlIdentityRepository, SqlProfileRepository, SqlQuotationRepository,
};
use cotiza_db::{connect, migrations, DbPool};
use cotiza_mail::SendGridGateway;
use cotiza_pdf::QuotationRenderer;

use crate::emails::EmailTemplates;
use crate::fulfillment::FulfillmentPipeline;
use crate::intake::IntakeState;
use crate::{health, intake, webhook};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("email template compilation failed: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let requests = Arc::new(SqlQuotationRepository::new(db_pool.clone()));
    let profiles = Arc::new(SqlProfileRepository::new(db_pool.clone()));
    let identities = Arc::new(SqlIdentityRepository::new(db_pool.clone()));

    let gateway = Arc::new(SendGridGateway::new(
        reqwest::Client::new(),
        config.mail.endpoint.clone(),
        config.mail.api_key.clone(),
    ));
    let templates = Arc::new(EmailTemplates::new().map_err(BootstrapError::Templates)?);

    // A missing or unreadable logo degrades to documents without one.
    let logo = match tokio::fs::read(&config.assets.logo_path).await {
        Ok(bytes) => Some(bytes),
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.logo_unavailable",
                path = %config.assets.logo_path.display(),
                error = %error,
                "quotation logo could not be read"
            );
            None
        }
    };
    let renderer = Arc::new(QuotationRenderer::new(logo));

    let pipeline = Arc::new(FulfillmentPipeline::new(
        requests.clone(),
        profiles.clone(),
        identities.clone(),
        renderer,
        gateway.clone(),
        templates.clone(),
        config.mail.sender.clone(),
    ));

    let router = health::router(db_pool.clone())
        .merge(webhook::router(pipeline))
        .merge(intake::router(IntakeState {
            requests,
            profiles,
            identities,
            gateway,
            templates,
            sender: config.mail.sender.clone(),
            operator_inbox: config.mail.operator_inbox.clone(),
        }));

    Ok(Application { config, db_pool, router })
}
