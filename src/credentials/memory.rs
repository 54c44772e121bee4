use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use super::{CredentialStore, NewPrincipal, Principal, Role};
use crate::error::{AccountError, AppError};

/// Process-local credential store for tests and local runs
#[derive(Default)]
pub struct InMemoryCredentialStore {
    principals: Mutex<HashMap<String, Principal>>,
    next_id: AtomicI64,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Principal>>, AppError> {
        self.principals
            .lock()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))
    }

    /// Remove a principal, as if the account had been deleted
    pub fn remove(&self, identifier: &str) -> Option<Principal> {
        self.principals.lock().ok()?.remove(identifier)
    }

    /// Flip the enabled flag of an existing principal
    pub fn set_enabled(&self, identifier: &str, enabled: bool) -> bool {
        match self.principals.lock() {
            Ok(mut principals) => match principals.get_mut(identifier) {
                Some(principal) => {
                    principal.enabled = enabled;
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, AppError> {
        Ok(self.lock()?.get(identifier).cloned())
    }

    async fn create(&self, principal: NewPrincipal) -> Result<Principal, AppError> {
        let mut principals = self.lock()?;
        if principals.contains_key(&principal.email) {
            return Err(AccountError::EmailAlreadyExists.into());
        }

        let created = Principal {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            email: principal.email,
            password_hash: principal.password_hash,
            role: principal.role,
            enabled: principal.enabled,
        };
        principals.insert(created.email.clone(), created.clone());
        Ok(created)
    }

    async fn update_role(&self, identifier: &str, role: Role) -> Result<bool, AppError> {
        match self.lock()?.get_mut(identifier) {
            Some(principal) => {
                principal.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
