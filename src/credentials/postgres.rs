use sqlx::PgPool;

use super::{CredentialStore, NewPrincipal, Principal, Role};
use crate::error::{AccountError, AppError, DatabaseError};

/// Credential store over the `users` table
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type PrincipalRow = (i64, String, String, String, bool);

fn into_principal(row: PrincipalRow) -> Result<Principal, AppError> {
    let (id, email, password_hash, role, enabled) = row;
    Ok(Principal {
        id,
        email,
        password_hash,
        role: role.parse()?,
        enabled,
    })
}

#[async_trait::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, AppError> {
        let row = sqlx::query_as::<_, PrincipalRow>(
            "SELECT id, email, password, role_type, enabled FROM users WHERE email = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_principal).transpose()
    }

    async fn exists_by_identifier(&self, identifier: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(identifier)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, principal: NewPrincipal) -> Result<Principal, AppError> {
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, password, role_type, enabled)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&principal.email)
        .bind(&principal.password_hash)
        .bind(principal.role.as_str())
        .bind(principal.enabled)
        .fetch_one(&self.pool)
        .await;

        let id = match result {
            Ok(id) => id,
            Err(e) => {
                return Err(match DatabaseError::from(e) {
                    DatabaseError::UniqueConstraintViolation(_) => {
                        AccountError::EmailAlreadyExists.into()
                    }
                    other => other.into(),
                })
            }
        };

        Ok(Principal {
            id,
            email: principal.email,
            password_hash: principal.password_hash,
            role: principal.role,
            enabled: principal.enabled,
        })
    }

    async fn update_role(&self, identifier: &str, role: Role) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET role_type = $1 WHERE email = $2")
            .bind(role.as_str())
            .bind(identifier)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
