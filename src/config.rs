use anyhow::Result;
use sea_orm::Database;

use crate::schemas::AppState;

/// Connect to the database and build the shared application state.
pub async fn initialize_app_state(database_url: &str) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    let engine = ledger::default_engine(db.clone());

    Ok(AppState { db, engine })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
