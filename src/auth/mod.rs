//! Request authentication: credential cookies, refresh-on-expiry and
//! access token verification.

pub mod cookies;
pub mod refresh;
pub mod verify;

pub use verify::{Principal, TokenVerifier, VerifyError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable credential on the request.
    #[error("not authenticated")]
    Unauthenticated,

    /// A credential was presented but did not verify.
    #[error("access token rejected: {0}")]
    Unauthorized(#[from] VerifyError),
}
