/// Bearer token authentication
///
/// `RequestAuthenticator` is the capability the gate composes; the bearer
/// implementation turns an `Authorization: Bearer <token>` header into an
/// `AuthContext` or a typed rejection.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use std::sync::Arc;

use crate::auth::{AuthContext, TokenCodec, VerifyResult};
use crate::credentials::CredentialStore;
use crate::error::{AccountError, AppError, AuthError};

const BEARER_PREFIX: &str = "Bearer ";

pub type AuthOutcome = Result<AuthContext, AppError>;

#[async_trait::async_trait]
pub trait RequestAuthenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome;
}

pub struct BearerAuthenticator {
    codec: TokenCodec,
    credentials: Arc<dyn CredentialStore>,
}

impl BearerAuthenticator {
    pub fn new(codec: TokenCodec, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { codec, credentials }
    }
}

/// Token part of a well-formed bearer header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
}

#[async_trait::async_trait]
impl RequestAuthenticator for BearerAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;

        let subject = match self.codec.verify(token) {
            VerifyResult::Success(subject) => subject,
            VerifyResult::Expired(subject) => {
                tracing::info!(user = %subject, "Access token expired");
                return Err(AuthError::ExpiredToken.into());
            }
            VerifyResult::Invalid(subject) => {
                tracing::warn!(
                    subject = subject.as_deref().unwrap_or("<unknown>"),
                    "Access token failed verification"
                );
                return Err(AuthError::InvalidToken.into());
            }
        };

        let principal = self
            .credentials
            .find_by_identifier(&subject)
            .await?
            .ok_or(AccountError::NotFoundUser)?;

        if !principal.enabled {
            return Err(AuthError::LoginError("account is disabled".to_string()).into());
        }

        Ok(AuthContext::new(principal))
    }
}
