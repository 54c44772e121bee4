/// Password Hashing and Verification
///
/// Credential hashes are bcrypt strings owned by the credential store.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AuthError, ValidationError};

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if the password is empty or bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()).into());
    }

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// An unreadable hash is an authentication fault, not a mismatch
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    verify(password, hash)
        .map_err(|e| AuthError::LoginError(format!("Password verification failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("ValidPassword123").expect("Failed to hash password");

        assert!(verify_password("ValidPassword123", &hash).unwrap());
        assert!(!verify_password("WrongPassword123", &hash).unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(hash_password("").is_err());
    }

    #[test]
    fn test_corrupt_hash_is_login_error() {
        let result = verify_password("whatever", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(AuthError::LoginError(_))));
    }
}
