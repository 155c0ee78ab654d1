//! Command implementations.

pub mod migrate;
pub mod seed;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;

/// Error raised when no database URL is configured.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: LODGE_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

/// The database URL, read the same way the site reads it.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();

    ["LODGE_DATABASE_URL", "DATABASE_URL"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
        .ok_or(MissingDatabaseUrl)
}

/// Errors that can occur while connecting.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using the site's pool settings.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(lodge_site::db::create_pool(&database_url).await?)
}
