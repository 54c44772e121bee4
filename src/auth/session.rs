/// Session Service
///
/// Login, reissue and logout over the token codec, the credential store and
/// the refresh token store. Holds no state of its own.
///
/// Reissue always rotates the refresh token. Two racing reissues (or a
/// reissue racing a logout) are last-write-wins on the store; the loser
/// fails the store match with `NotMatchedRefreshToken` and has to log in
/// again.

use std::sync::Arc;

use crate::auth::context::AuthContext;
use crate::auth::jwt::{TokenCodec, TokenPair, VerifyResult};
use crate::auth::password::verify_password;
use crate::auth::refresh_token::RefreshTokenStore;
use crate::credentials::{CredentialStore, Principal};
use crate::error::{AccountError, AppError, AuthError};

/// Principal plus the freshly issued token pair
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionService {
    codec: TokenCodec,
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: RefreshTokenStore,
}

impl SessionService {
    pub fn new(
        codec: TokenCodec,
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: RefreshTokenStore,
    ) -> Self {
        Self {
            codec,
            credentials,
            refresh_tokens,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve a principal by identifier
    ///
    /// # Errors
    /// `NotFoundUser` when the account does not exist
    pub async fn load_principal(&self, identifier: &str) -> Result<Principal, AppError> {
        self.credentials
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| AccountError::NotFoundUser.into())
    }

    /// Authenticate and start a session
    ///
    /// # Errors
    /// - `NotFoundUser`: no such principal
    /// - `InvalidPassword`: credential mismatch
    /// - `LoginError`: disabled account or unreadable credential hash
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<LoginOutcome, AppError> {
        let principal = self.load_principal(identifier).await?;

        if !principal.enabled {
            return Err(AuthError::LoginError("account is disabled".to_string()).into());
        }

        if !verify_password(secret, &principal.password_hash)? {
            return Err(AuthError::InvalidPassword.into());
        }

        let tokens = self.start_rotation(&principal).await?;

        tracing::info!(user = %principal.identifier(), "User logged in");
        Ok(LoginOutcome { principal, tokens })
    }

    /// Exchange a refresh token for a brand-new pair
    ///
    /// # Errors
    /// - `InvalidRefreshToken`: token is expired, tampered or malformed
    /// - `NotFoundUser`: subject no longer exists
    /// - `NotMatchedRefreshToken`: token is not the currently recorded one
    pub async fn reissue(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let subject = match self.codec.verify(refresh_token) {
            VerifyResult::Success(subject) => subject,
            other => {
                tracing::warn!(
                    outcome = ?other,
                    "Refresh token rejected during reissue"
                );
                return Err(AuthError::InvalidRefreshToken.into());
            }
        };

        let principal = self.load_principal(&subject).await?;

        if !self.refresh_tokens.is_valid(principal.identifier(), refresh_token).await? {
            tracing::warn!(
                user = %principal.identifier(),
                "Presented refresh token is not the current rotation"
            );
            return Err(AuthError::NotMatchedRefreshToken.into());
        }

        let tokens = self.start_rotation(&principal).await?;

        tracing::info!(user = %principal.identifier(), "Tokens reissued");
        Ok(tokens)
    }

    /// End the caller's session by dropping its refresh record
    ///
    /// # Errors
    /// `NotFoundUser` when there is no authenticated caller
    pub async fn logout(&self, context: Option<&AuthContext>) -> Result<(), AppError> {
        let context = context.ok_or(AccountError::NotFoundUser)?;

        self.refresh_tokens.delete(context.identifier()).await?;

        tracing::info!(user = %context.identifier(), "User logged out");
        Ok(())
    }

    async fn start_rotation(&self, principal: &Principal) -> Result<TokenPair, AppError> {
        let tokens = self.codec.issue_pair(principal.identifier())?;
        self.refresh_tokens
            .save(
                principal.identifier(),
                &tokens.refresh_token,
                self.codec.refresh_token_expiry(),
            )
            .await?;
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::configuration::JwtSettings;
    use crate::credentials::{InMemoryCredentialStore, NewPrincipal, Role};
    use crate::error::StoreError;
    use crate::store::{InMemoryStore, KeyValueStore};

    const EMAIL: &str = "user@x.com";
    const PASSWORD: &str = "SecurePass123";

    struct Harness {
        service: SessionService,
        credentials: Arc<InMemoryCredentialStore>,
        backing: Arc<InMemoryStore>,
    }

    async fn harness() -> Harness {
        let codec = TokenCodec::new(&JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        });
        let credentials = Arc::new(InMemoryCredentialStore::new());
        credentials
            .create(NewPrincipal {
                email: EMAIL.to_string(),
                password_hash: hash_password(PASSWORD).unwrap(),
                role: Role::User,
                enabled: true,
            })
            .await
            .unwrap();
        let backing = Arc::new(InMemoryStore::new());
        let service = SessionService::new(
            codec,
            credentials.clone(),
            RefreshTokenStore::new(backing.clone()),
        );

        Harness {
            service,
            credentials,
            backing,
        }
    }

    fn assert_auth_error(err: AppError, expected: AuthError) {
        match err {
            AppError::Auth(actual) => assert_eq!(actual, expected),
            other => panic!("Expected {:?}, got {:?}", expected, other),
        }
    }

    #[tokio::test]
    async fn test_login_issues_pair_and_records_refresh_token() {
        let h = harness().await;
        let outcome = h.service.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(outcome.principal.email, EMAIL);
        assert_eq!(
            h.service.codec().verify(&outcome.tokens.access_token),
            VerifyResult::Success(EMAIL.to_string())
        );
        assert!(h.backing.get("refresh_token:user@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let h = harness().await;

        let err = h.service.login("nobody@x.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AppError::Account(AccountError::NotFoundUser)));

        let err = h.service.login(EMAIL, "WrongPass123").await.unwrap_err();
        assert_auth_error(err, AuthError::InvalidPassword);

        h.credentials.set_enabled(EMAIL, false);
        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::LoginError(_))));
    }

    #[tokio::test]
    async fn test_reissue_rotates_tokens() {
        let h = harness().await;
        let first = h.service.login(EMAIL, PASSWORD).await.unwrap().tokens;

        let second = h.service.reissue(&first.refresh_token).await.unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);

        // The rotated-out token is now a replay
        let err = h.service.reissue(&first.refresh_token).await.unwrap_err();
        assert_auth_error(err, AuthError::NotMatchedRefreshToken);

        // The current one still works
        assert!(h.service.reissue(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh_token() {
        let h = harness().await;
        let outcome = h.service.login(EMAIL, PASSWORD).await.unwrap();
        let context = AuthContext::new(outcome.principal.clone());

        h.service.logout(Some(&context)).await.unwrap();

        let err = h.service.reissue(&outcome.tokens.refresh_token).await.unwrap_err();
        assert_auth_error(err, AuthError::NotMatchedRefreshToken);
    }

    #[tokio::test]
    async fn test_logout_without_context() {
        let h = harness().await;
        let err = h.service.logout(None).await.unwrap_err();
        assert!(matches!(err, AppError::Account(AccountError::NotFoundUser)));
    }

    #[tokio::test]
    async fn test_reissue_with_invalid_or_expired_token() {
        let h = harness().await;

        let err = h.service.reissue("not-a-token").await.unwrap_err();
        assert_auth_error(err, AuthError::InvalidRefreshToken);

        let expired = h.service.codec().issue(EMAIL, 0).unwrap();
        let err = h.service.reissue(&expired).await.unwrap_err();
        assert_auth_error(err, AuthError::InvalidRefreshToken);
    }

    #[tokio::test]
    async fn test_reissue_for_deleted_account() {
        let h = harness().await;
        let tokens = h.service.login(EMAIL, PASSWORD).await.unwrap().tokens;
        h.credentials.remove(EMAIL);

        let err = h.service.reissue(&tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Account(AccountError::NotFoundUser)));
    }

    #[tokio::test]
    async fn test_signed_but_unrecorded_token_is_not_matched() {
        let h = harness().await;
        h.service.login(EMAIL, PASSWORD).await.unwrap();

        let forged = h.service.codec().issue_refresh_token(EMAIL).unwrap();
        let err = h.service.reissue(&forged).await.unwrap_err();
        assert_auth_error(err, AuthError::NotMatchedRefreshToken);
    }

    struct UnavailableStore;

    #[async_trait::async_trait]
    impl KeyValueStore for UnavailableStore {
        async fn set_ex(&self, _: &str, _: &str, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let h = harness().await;
        let tokens = h.service.login(EMAIL, PASSWORD).await.unwrap().tokens;

        let broken = SessionService::new(
            h.service.codec().clone(),
            h.credentials.clone(),
            RefreshTokenStore::new(Arc::new(UnavailableStore)),
        );

        let err = broken.reissue(&tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        let err = broken.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
