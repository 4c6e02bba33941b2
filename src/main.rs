// src/main.rs

use blogdeck::config::Config;
use blogdeck::handlers::auth::insert_user;
use blogdeck::routes;
use blogdeck::state::AppState;
use blogdeck::utils::hash::hash_password;
use blogdeck::{db, error::AppError};
use dotenvy::dotenv;
use sqlx::SqlitePool;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
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

    // Open the store and apply migrations
    let pool = db::connect_and_migrate(&config.database_url, 5)
        .await
        .expect("Failed to open database and apply migrations");
    tracing::info!("Database ready at {}", config.database_url);

    // Seed the operator account on an empty store
    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let addr = config.bind_addr;

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Creates the configured operator account through the regular signup
/// insert, which only makes it admin when no other user exists yet.
async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let hashed_password = hash_password(password)?;
    // Gate closed on purpose: this only succeeds on an empty store.
    match insert_user(pool, email, None, &hashed_password, false).await? {
        Some(user) => tracing::info!("Seeded operator account {}", user.email),
        None => tracing::debug!("Users already exist, operator account not seeded"),
    }
    Ok(())
}
