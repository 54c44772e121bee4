/// Email Verification
///
/// Six-digit codes are kept in the key/value store under
/// `email_code:<purpose>:<mail>` for `code_ttl` seconds. A correct code
/// promotes the principal to `USER` and is consumed.

use rand::Rng;
use std::sync::Arc;

use crate::auth::AuthContext;
use crate::credentials::{CredentialStore, Role};
use crate::email_client::EmailSender;
use crate::error::{AccountError, AppError, AuthError, VerificationError};
use crate::store::KeyValueStore;
use crate::validators::{is_valid_email, is_valid_purpose};

const CODE_KEY_PREFIX: &str = "email_code";

#[derive(Clone)]
pub struct EmailVerificationService {
    store: Arc<dyn KeyValueStore>,
    credentials: Arc<dyn CredentialStore>,
    email_sender: Arc<dyn EmailSender>,
    code_ttl: u64,
}

impl EmailVerificationService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialStore>,
        email_sender: Arc<dyn EmailSender>,
        code_ttl: u64,
    ) -> Self {
        Self {
            store,
            credentials,
            email_sender,
            code_ttl,
        }
    }

    /// Generate, store and mail a fresh code. A previous code for the same
    /// purpose is overwritten.
    pub async fn send_code(
        &self,
        context: &AuthContext,
        mail: &str,
        purpose: &str,
    ) -> Result<(), AppError> {
        let key = self.owned_key(context, mail, purpose)?;
        let code = generate_code();

        self.store.set_ex(&key, &code, self.code_ttl).await?;

        let html = format!(
            "<p>Your verification code is <strong>{}</strong>.</p>\
             <p>It expires in {} minutes.</p>",
            code,
            self.code_ttl / 60
        );
        self.email_sender
            .send_email(mail.trim(), "Email verification code", &html)
            .await?;

        tracing::info!(user = %context.identifier(), purpose = %purpose, "Verification code sent");
        Ok(())
    }

    /// Check a code and promote the caller to `USER`
    ///
    /// # Errors
    /// - `InvalidCode`: no code stored or the code differs
    /// - `NotFoundUser`: the principal disappeared in the meantime
    pub async fn verify_code(
        &self,
        context: &AuthContext,
        mail: &str,
        purpose: &str,
        verify_code: &str,
    ) -> Result<(), AppError> {
        let key = self.owned_key(context, mail, purpose)?;

        match self.store.get(&key).await? {
            Some(stored) if stored == verify_code.trim() => {}
            _ => {
                tracing::warn!(user = %context.identifier(), purpose = %purpose, "Verification code mismatch");
                return Err(VerificationError::InvalidCode.into());
            }
        }

        if !self.credentials.update_role(context.identifier(), Role::User).await? {
            return Err(AccountError::NotFoundUser.into());
        }
        self.store.delete(&key).await?;

        tracing::info!(user = %context.identifier(), "Email verified, role promoted to USER");
        Ok(())
    }

    fn owned_key(&self, context: &AuthContext, mail: &str, purpose: &str) -> Result<String, AppError> {
        let mail = is_valid_email(mail)?;
        let purpose = is_valid_purpose(purpose)?;

        if mail != context.identifier() {
            tracing::warn!(
                user = %context.identifier(),
                mail = %mail,
                "Verification requested for another account"
            );
            return Err(AuthError::Forbidden.into());
        }

        Ok(format!("{}:{}:{}", CODE_KEY_PREFIX, purpose, mail))
    }
}

fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}
