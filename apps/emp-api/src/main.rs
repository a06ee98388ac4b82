use axum_helpers::{JwtAuth, create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{AccountMailer, MongoUserRepository};
use email::{Mailer, SmtpProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to MongoDB at {}", config.mongodb.redacted_url());
    let mongo_client =
        database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await?;
    let db = mongo_client.database(config.mongodb.database());
    info!(database = config.mongodb.database(), "Connected to MongoDB");

    let users = Arc::new(MongoUserRepository::new(&db));
    users.init_indexes().await?;

    let mailer = Mailer::new(Arc::new(SmtpProvider::new(config.smtp.clone())?));
    let account_mailer = Arc::new(AccountMailer::new(mailer.clone(), &config.accounts)?);

    let state = AppState {
        jwt: JwtAuth::new(&config.jwt),
        config,
        mongo_client,
        users,
        mailer,
        account_mailer,
    };

    let mongo_client = state.mongo_client.clone();
    let api_routes = api::routes(&state);
    let router = create_router::<openapi::ApiDoc>(api_routes, &state.config.cors);
    let app = router.merge(health_router(state.config.app.clone()));

    info!("Starting EMP API with graceful shutdown (30s timeout)");

    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing MongoDB connections");
            mongo_client.shutdown().await;
            info!("MongoDB connection closed");
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("EMP API shutdown complete");
    Ok(())
}
