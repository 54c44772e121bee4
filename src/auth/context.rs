/// Authenticated request context
///
/// Installed into the request extensions by the authentication gate and
/// handed to handlers explicitly as an extractor argument.

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::credentials::{Principal, Role};
use crate::error::{AccountError, AppError};

#[derive(Debug, Clone)]
pub struct AuthContext {
    principal: Principal,
    authorities: Vec<String>,
}

impl AuthContext {
    pub fn new(principal: Principal) -> Self {
        let authorities = principal.authorities();
        Self {
            principal,
            authorities,
        }
    }

    pub fn identifier(&self) -> &str {
        self.principal.identifier()
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles
            .iter()
            .any(|role| self.authorities.iter().any(|a| *a == role.authority()))
    }
}

impl FromRequest for AuthContext {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let context = req.extensions().get::<AuthContext>().cloned();
        ready(context.ok_or_else(|| AccountError::NotFoundUser.into()))
    }
}
