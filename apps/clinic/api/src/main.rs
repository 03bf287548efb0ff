use axum_helpers::server::{create_production_app, health_router};
use axum_helpers::{JwtAuth, RedisAuthStore};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{PgUserRepository, UserService};
use std::sync::Arc;
use tracing::info;

mod api;
mod bootstrap;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Colored error reports before anything fallible runs
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    // Connect both stores concurrently
    let postgres_future = async {
        database::postgres::connect_from_config_with_retry(
            config.database.clone(),
            Some(config.retry.clone()),
        )
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))
    };

    let redis_future = async {
        database::redis::connect_from_config_with_retry(config.redis.clone(), Some(config.retry.clone()))
            .await
            .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))
    };

    let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    if let Some(admin) = &config.admin {
        let users = UserService::new(PgUserRepository::new(db.clone()));
        bootstrap::ensure_admin(&users, admin)
            .await
            .map_err(|e| eyre::eyre!("Bootstrap administrator failed: {}", e))?;
    }

    // Tokens are whitelisted and revoked in Redis
    let jwt_auth = JwtAuth::new(Arc::new(RedisAuthStore::new(redis.clone())), &config.jwt);

    let state = AppState {
        config,
        db,
        redis,
        jwt_auth,
    };

    let api_routes = api::routes(&state);

    // create_router nests the API under /api and adds docs and middleware
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes)?;

    // /health is liveness; /ready pings PostgreSQL and Redis
    let app = router
        .merge(health_router(state.config.app.clone()))
        .merge(api::ready_router(state.clone()));

    info!(
        name = state.config.app.name,
        version = state.config.app.version,
        "Starting clinic API"
    );

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, async move {
        info!("Shutting down: closing database connections");
        let AppState { db, redis, .. } = state;
        tokio::join!(database::postgres::close(db), async move {
            // ConnectionManager closes on drop
            drop(redis);
            info!("Redis connection closed");
        });
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Clinic API shutdown complete");
    Ok(())
}
