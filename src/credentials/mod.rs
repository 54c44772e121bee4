/// Credential Store
///
/// Principal records and the narrow port the auth core uses to read them.
/// The core only looks principals up; registration and the role promotion
/// after email verification are the only writes.

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Access level of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Registered but email not yet verified
    Nobody,
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Nobody => "NOBODY",
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// Authority string granted to the request context
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOBODY" => Ok(Role::Nobody),
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(AppError::Internal(format!("Unknown role type: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i64,
    /// Stable unique identifier; the email address
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

impl Principal {
    pub fn identifier(&self) -> &str {
        &self.email
    }

    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.authority()]
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields needed to create a principal
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, AppError>;

    async fn exists_by_identifier(&self, identifier: &str) -> Result<bool, AppError> {
        Ok(self.find_by_identifier(identifier).await?.is_some())
    }

    /// Insert a principal. Fails with `EmailAlreadyExists` on a duplicate.
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, AppError>;

    /// Returns `false` when no principal has this identifier
    async fn update_role(&self, identifier: &str, role: Role) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [Role::Nobody, Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn test_authorities() {
        let principal = Principal {
            id: 1,
            email: "admin@x.com".into(),
            password_hash: "$2b$...".into(),
            role: Role::Admin,
            enabled: true,
        };

        assert_eq!(principal.authorities(), vec!["ROLE_ADMIN".to_string()]);
        assert!(principal.is_admin());
        assert_eq!(principal.identifier(), "admin@x.com");
    }
}
