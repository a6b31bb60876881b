//! Stimmap API Server Binary
//!
//! # Usage
//!
//! ```bash
//! STIMMAP_TOKENS="secret-token=admin" cargo run --bin stimmap-server
//! ```
//!
//! # Environment Variables
//!
//! - `STIMMAP_PORT`: server port (default: 8080)
//! - `STIMMAP_DB_PATH`: database file (default: ~/.stimmap/database/stimmap.db)
//! - `STIMMAP_TOKENS`: bearer token table, `token=userUid` comma separated
//! - `STIMMAP_ADMIN_UID`: user uid to bootstrap as admin if missing
//! - `RUST_LOG`: logging level (e.g. "info", "debug")

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use stimmap_core::{DatabaseService, UserType};
use stimmap_server::{AppState, StaticTokenResolver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Stimmap API server");

    let port = env::var("STIMMAP_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let db_path = match env::var("STIMMAP_DB_PATH") {
        Ok(custom) => PathBuf::from(custom),
        Err(_) => {
            let home_dir =
                dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?;
            home_dir
                .join(".stimmap")
                .join("database")
                .join("stimmap.db")
        }
    };

    tracing::info!("Database: {}", db_path.display());
    let db = DatabaseService::new(db_path).await?;

    // First-run bootstrap so the token table has an admin to point at
    if let Ok(admin_uid) = env::var("STIMMAP_ADMIN_UID") {
        if db.db_get_user_by_uid(&admin_uid).await?.is_none() {
            db.db_create_user(&admin_uid, None, None, None, UserType::Admin)
                .await?;
            tracing::info!(%admin_uid, "bootstrapped admin user");
        }
    }

    let tokens = env::var("STIMMAP_TOKENS").unwrap_or_default();
    let resolver = StaticTokenResolver::from_env_table(&tokens);

    let state = AppState::new(db, Arc::new(resolver));
    stimmap_server::start_server(state, port).await
}
