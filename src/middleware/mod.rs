/// Middleware module
///
/// Request authentication gate and request logging.

mod auth_gate;
mod authenticator;
mod logger;
mod policy;

pub use auth_gate::AuthenticationGate;
pub use authenticator::{bearer_token, AuthOutcome, BearerAuthenticator, RequestAuthenticator};
pub use logger::LoggerMiddleware;
pub use policy::{AccessRule, GatePolicy, PathPattern, Requirement};
