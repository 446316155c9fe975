use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub fn normalize_email(email: &str) -> CoreResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if !valid {
        return Err(CoreError::ValidationError(
            "A valid email address is required".to_string(),
        ));
    }
    Ok(email)
}

pub fn validate_person_name(field: &str, value: &str) -> CoreResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError(format!("{} is required", field)));
    }
    if !trimmed.chars().all(|c| c.is_alphabetic() || c == '-') {
        return Err(CoreError::ValidationError(format!(
            "{} should only contain letters",
            field
        )));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> CoreResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Salted SHA-256, stored as `base64(salt)$base64(digest)`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let digest = digest_with_salt(&salt, password);
    format!("{}${}", BASE64.encode(salt), BASE64.encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (BASE64.decode(salt_b64), BASE64.decode(digest_b64)) else {
        return false;
    };

    let actual = digest_with_salt(&salt, password);
    constant_time_eq(&actual, &expected)
}

fn digest_with_salt(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse battery");
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same input"), hash_password("same input"));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-hash"));
        assert!(!verify_password("anything", "!!$!!"));
    }

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(
            normalize_email(" Pilot@Example.COM ").unwrap(),
            "pilot@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@missing.local").is_err());
        assert!(normalize_email("user@nodot").is_err());
    }

    #[test]
    fn person_names_must_be_alphabetic() {
        assert!(validate_person_name("first_name", "Anne-Marie").is_ok());
        assert!(validate_person_name("first_name", "R2D2").is_err());
        assert!(validate_person_name("first_name", "").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
