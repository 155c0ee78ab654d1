//! Staff authentication with Argon2id password hashes.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use lodge_core::{AccessLevel, Email, UserId};

use crate::db::{BookingRepository, RepositoryError};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] lodge_core::EmailError),

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Sign-in and account creation for staff.
pub struct AuthService<'a> {
    repo: &'a dyn BookingRepository,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn BookingRepository) -> Self {
        Self { repo }
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .repo
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Create a staff account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn create_staff(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
        access_level: AccessLevel,
    ) -> Result<UserId, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.repo
            .create_user(&NewUser {
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
                email,
                password_hash,
                access_level,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryBookingRepository;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_create_and_login() {
        let repo = MemoryBookingRepository::new();
        let auth = AuthService::new(&repo);
        let id = auth
            .create_staff("Ana", "Owner", "ana@example.com", "long enough", AccessLevel::Admin)
            .await
            .unwrap();

        let user = auth.login("ANA@example.com".trim(), "long enough").await;
        // Local part is case sensitive
        assert!(matches!(user, Err(AuthError::InvalidCredentials)));

        let user = auth.login("ana@EXAMPLE.com", "long enough").await.unwrap();
        assert_eq!(user.id, id);
        assert!(matches!(
            auth.login("ana@example.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_short_password_and_duplicates() {
        let repo = MemoryBookingRepository::new();
        let auth = AuthService::new(&repo);
        assert!(matches!(
            auth.create_staff("A", "B", "a@example.com", "short", AccessLevel::Staff)
                .await,
            Err(AuthError::WeakPassword(_))
        ));
        auth.create_staff("A", "B", "a@example.com", "longer pass", AccessLevel::Staff)
            .await
            .unwrap();
        assert!(matches!(
            auth.create_staff("A", "B", "a@example.com", "longer pass", AccessLevel::Staff)
                .await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
