// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use quizhub::config::{Config, StoreBackend};
use quizhub::models::profile::{NewProfile, Role};
use quizhub::routes;
use quizhub::state::AppState;
use quizhub::store::{DynStore, MemoryStore, PostgresStore};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "quizhub.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: DynStore = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = connect_with_retry(&config.database_url).await?;

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied successfully.");

            Arc::new(PostgresStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if let Err(e) = seed_admin(&store, &config).await {
        tracing::error!("Failed to seed admin profile: {:?}", e);
    }

    let state = AppState {
        store,
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Database connected...");
                return Ok(pool);
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_admin(store: &DynStore, config: &Config) -> Result<(), quizhub::error::AppError> {
    let Some(admin_id) = &config.admin_user_id else {
        return Ok(());
    };

    let (profile, created) = store
        .ensure_profile(NewProfile::new(admin_id, None, "Administrator".to_string(), Role::Admin))
        .await?;

    if created {
        tracing::info!("Seeded admin profile: {}", profile.id);
    } else if profile.role != Role::Admin {
        tracing::warn!(
            "ADMIN_USER_ID {} already has a {} profile; left unchanged",
            profile.id,
            profile.role
        );
    }

    Ok(())
}
