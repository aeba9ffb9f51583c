// src/utils/hash.rs

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// The configured admin login. The plain password is hashed on load and dropped.
#[derive(Clone, Debug)]
pub struct AdminAccount {
    pub username: String,
    password_hash: String,
}

impl AdminAccount {
    pub fn from_plain(username: &str, password: &str) -> Result<Self, AppError> {
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<bool, AppError> {
        if username != self.username {
            return Ok(false);
        }
        verify_password(password, &self.password_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_account_verifies_only_its_credentials() {
        let admin = AdminAccount::from_plain("proctor", "correct horse").unwrap();

        assert!(admin.verify("proctor", "correct horse").unwrap());
        assert!(!admin.verify("proctor", "wrong").unwrap());
        assert!(!admin.verify("someone", "correct horse").unwrap());
        assert!(!admin.password_hash.contains("correct horse"));
    }
}
