/// Authentication Gate Middleware
///
/// Runs in front of every handler:
/// - allow-listed paths pass through unauthenticated
/// - everything else is authenticated by the configured `RequestAuthenticator`
///   and then checked against the access rules
/// - on success the `AuthContext` is installed into the request extensions
///
/// Rejections are returned as `AppError`, so the status code and envelope
/// come from the one error translator. The gate holds only shared read-only
/// state.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use super::authenticator::RequestAuthenticator;
use super::policy::GatePolicy;

pub struct AuthenticationGate {
    authenticator: Arc<dyn RequestAuthenticator>,
    policy: Arc<GatePolicy>,
}

impl AuthenticationGate {
    pub fn new(authenticator: Arc<dyn RequestAuthenticator>, policy: GatePolicy) -> Self {
        Self {
            authenticator,
            policy: Arc::new(policy),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticationGateService {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
            policy: self.policy.clone(),
        }))
    }
}

pub struct AuthenticationGateService<S> {
    service: Rc<S>,
    authenticator: Arc<dyn RequestAuthenticator>,
    policy: Arc<GatePolicy>,
}

impl<S, B> Service<ServiceRequest> for AuthenticationGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.policy.is_public(req.path()) {
            tracing::debug!(path = %req.path(), "Public path, skipping authentication");
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = self.service.clone();
        let authenticator = self.authenticator.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let path = req.path().to_string();

            let context = match authenticator.authenticate(req.headers()).await {
                Ok(context) => context,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Request rejected by authentication gate");
                    return Err(e.into());
                }
            };

            policy.authorize(&path, &context)?;

            tracing::debug!(
                user = %context.identifier(),
                path = %path,
                "Token verified"
            );
            req.extensions_mut().insert(context);

            service.call(req).await
        })
    }
}
