use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use api::{
    AppState,
    auth::JwtService,
    config::AppConfig,
    locks::StashLocks,
    repositories::Repositories,
    routes,
    service::StashService,
};
use common::{
    cache::RedisPool,
    database::{PgDocumentStore, ensure_schema, health_check, init_pool},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    info!("Starting stash API service");
    if config.jwt.uses_development_secret() {
        warn!("Using the built-in development JWT secret; set STASH__JWT__SECRET in production");
    }

    // Initialize database connection pool
    let pool = init_pool(&config.database).await?;
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    ensure_schema(&pool).await?;

    let redis_pool = match &config.redis {
        Some(redis_config) => {
            let redis_pool = RedisPool::new(redis_config)?;
            if !redis_pool.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }
            info!("Redis connection successful");
            Some(redis_pool)
        }
        None => {
            warn!("Redis is not configured; logout cannot revoke refresh tokens");
            None
        }
    };

    let repos = Repositories::new(Arc::new(PgDocumentStore::new(pool)));
    let app_state = AppState {
        service: StashService::new(repos, StashLocks::new()),
        jwt_service: JwtService::new(&config.jwt),
        redis_pool,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Stash API service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
