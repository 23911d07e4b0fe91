use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AppError;
use crate::models::account::Credential;

/// A way of proving a stored credential. Strategies are plain values
/// built per request from the login payload; there is no shared
/// registry.
pub trait CredentialVerifier {
    fn verify(&self, credential: &Credential) -> Result<(), AppError>;
}

/// Local email/password login, checked against the argon2 hash.
pub struct LocalPassword<'a> {
    pub password: &'a str,
}

impl CredentialVerifier for LocalPassword<'_> {
    fn verify(&self, credential: &Credential) -> Result<(), AppError> {
        let Credential::Password { hash } = credential else {
            return Err(AppError::Unauthorized(
                "account does not use password login".to_string(),
            ));
        };

        let parsed = PasswordHash::new(hash)
            .map_err(|err| AppError::Internal(format!("stored hash is malformed: {err}")))?;

        Argon2::default()
            .verify_password(self.password.as_bytes(), &parsed)
            .map_err(|_| AppError::Unauthorized("invalid credentials".to_string()))
    }
}

/// Login through an external identity provider; the provider has already
/// authenticated the user, we only match the stored identity.
pub struct ExternalIdentity<'a> {
    pub provider: &'a str,
    pub subject: &'a str,
}

impl CredentialVerifier for ExternalIdentity<'_> {
    fn verify(&self, credential: &Credential) -> Result<(), AppError> {
        let Credential::External { provider, subject } = credential else {
            return Err(AppError::Unauthorized(
                "account does not use external login".to_string(),
            ));
        };

        if provider == self.provider && subject == self.subject {
            Ok(())
        } else {
            Err(AppError::Unauthorized("invalid credentials".to_string()))
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Internal(format!("password hashing failed: {err}")))
}
