//! Password policy and bcrypt hashing.
//!
//! Hashing is CPU-bound, so both hashing and verification run on tokio's
//! blocking pool.

use std::borrow::Cow;
use tracing::instrument;
use validator::ValidationError;

use crate::error::{UserError, UserResult};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const SPECIAL_CHARACTERS: &str = "@$!%*?&";

pub const POLICY_MESSAGE: &str = "Password must be 8-128 characters long and include at least one \
     uppercase letter, one lowercase letter, one number and one special character (@$!%*?&)";

/// Whether `password` satisfies the account password policy.
pub fn meets_policy(password: &str) -> bool {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return false;
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || SPECIAL_CHARACTERS.contains(c);
    password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIAL_CHARACTERS.contains(c))
}

/// `validator` hook for password fields
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if meets_policy(password) {
        Ok(())
    } else {
        Err(ValidationError::new("password_policy").with_message(Cow::Borrowed(POLICY_MESSAGE)))
    }
}

/// Policy check for paths that do not go through a validated DTO.
pub fn ensure_policy(password: &str) -> UserResult<()> {
    if meets_policy(password) {
        Ok(())
    } else {
        Err(UserError::Validation(POLICY_MESSAGE.to_string()))
    }
}

#[instrument(skip_all)]
pub async fn hash_password(password: &str) -> UserResult<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await??;
    Ok(hash)
}

#[instrument(skip_all)]
pub async fn verify_password(password: &str, hash: &str) -> UserResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_accepts_strong_password() {
        assert!(meets_policy("Secret1!"));
        assert!(meets_policy("Abcdefg1@"));
    }

    #[test]
    fn test_policy_rejects_weak_passwords() {
        assert!(!meets_policy("Secr1!"), "too short");
        assert!(!meets_policy("secret11!"), "no uppercase");
        assert!(!meets_policy("SECRET11!"), "no lowercase");
        assert!(!meets_policy("Secretss!"), "no digit");
        assert!(!meets_policy("Secret111"), "no special");
        assert!(!meets_policy("Secret1!#"), "character outside allowed set");
        assert!(!meets_policy(&format!("Aa1!{}", "a".repeat(125))), "too long");
    }

    #[test]
    fn test_validator_hook_message() {
        let err = validate_password("weak").unwrap_err();
        assert_eq!(err.code, "password_policy");
        assert_eq!(err.message.as_deref(), Some(POLICY_MESSAGE));
    }

    #[tokio::test]
    async fn test_hash_differs_from_plaintext_and_verifies() {
        let hash = hash_password("Secret1!").await.unwrap();
        assert_ne!(hash, "Secret1!");
        assert!(hash.starts_with("$2"));

        assert!(verify_password("Secret1!", &hash).await.unwrap());
        assert!(!verify_password("Secret2!", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_against_malformed_hash_is_error() {
        let result = verify_password("Secret1!", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(UserError::PasswordHash(_))));
    }
}
