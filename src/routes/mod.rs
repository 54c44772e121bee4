mod auth;
mod email;
mod health_check;
mod sentence_sets;

pub use auth::{email_check, login, logout, me, register, reissue, PrincipalSummary};
pub use email::{send_verification_code, verify_code};
pub use health_check::health_check;
pub use sentence_sets::mark_viewed;

use serde::{Deserialize, Serialize};

/// Success envelope; failures use `ErrorResponse`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "OK".to_string(),
            data,
        }
    }

    pub fn accepted(data: T) -> Self {
        Self {
            code: 202,
            message: "ACCEPTED".to_string(),
            data,
        }
    }
}
