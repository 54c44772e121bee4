/// Authentication module
///
/// Token issuance and verification, credential hashing, the refresh token
/// store, the session service and the authenticated request context.

mod claims;
mod context;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::Claims;
pub use context::AuthContext;
pub use jwt::{TokenCodec, TokenPair, VerifyResult};
pub use password::{hash_password, verify_password};
pub use refresh_token::RefreshTokenStore;
pub use session::{LoginOutcome, SessionService};
