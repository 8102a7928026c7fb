//! Cooperative society backend server
//! Mission: Serve member, loan and dashboard data behind signed session tokens

use anyhow::{Context, Result};
use clap::Parser;
use coop_backend::{
    api::{build_router, AppState},
    auth::{AuthState, TokenSigner, UserStore},
    config::AppConfig,
    middleware::cors_layer,
    storage::CoopStore,
};
use dotenv::dotenv;
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coop-backend")]
#[command(about = "Cooperative society backend API")]
struct Cli {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();
    let cli = Cli::parse();

    info!("🚀 Cooperative backend starting");

    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    info!("⚙️  Configuration: {:?}", config);

    let user_store = Arc::new(UserStore::new(&config.database_path)?);
    let store = Arc::new(CoopStore::new(&config.database_path)?);
    info!("💾 Database initialized at: {}", config.database_path);

    match &config.admin {
        Some(admin) => {
            if user_store.ensure_admin(&admin.email, &admin.password)? {
                info!("👤 Bootstrap admin created: {}", admin.email);
            }
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no bootstrap admin will be created"),
    }

    let signer = Arc::new(
        TokenSigner::new(&config.jwt_secret, config.token_ttl_secs)
            .context("Failed to initialize token signer")?,
    );
    info!(
        "🔐 Session tokens: HS256, lifetime {}s",
        config.token_ttl_secs
    );

    let auth_state = AuthState::new(user_store.clone(), signer, config.secure_cookies);
    let app_state = AppState { store, user_store };
    let app = build_router(
        auth_state,
        app_state,
        cors_layer(&config.cors_allowed_origins),
    );

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coop_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Fall back to the crate directory when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
