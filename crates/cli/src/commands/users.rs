//! Staff account commands.

use thiserror::Error;

use lodge_core::AccessLevel;
use lodge_site::db::PgBookingRepository;
use lodge_site::services::{AuthError, AuthService};

/// Errors that can occur while managing staff accounts.
#[derive(Debug, Error)]
pub enum UserError {
    /// Invalid access level.
    #[error("Invalid access level: {0}. Valid levels: staff, admin")]
    InvalidAccessLevel(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Connect(#[from] super::ConnectError),
}

/// Create a staff account.
///
/// # Errors
///
/// Returns an error if the access level, email or password is invalid, the
/// email is already registered, or the database is unreachable.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    access_level: &str,
    password: &str,
) -> Result<(), UserError> {
    let access_level: AccessLevel = access_level
        .parse()
        .map_err(|_| UserError::InvalidAccessLevel(access_level.to_owned()))?;

    let pool = super::connect().await?;
    let repo = PgBookingRepository::new(pool);

    tracing::info!("Creating staff account: {} ({:?})", email, access_level);
    let id = AuthService::new(&repo)
        .create_staff(first_name, last_name, email, password, access_level)
        .await?;

    tracing::info!("Staff account created with id {id}");
    Ok(())
}
