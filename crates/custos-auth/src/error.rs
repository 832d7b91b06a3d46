//! Authentication error types.
//!
//! Token failures are deliberately distinct variants: clients recover
//! differently from an expired token (silent refresh) than from a
//! version mismatch (forced re-login).

use custos_core::error::CustosError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is suspended")]
    AccountSuspended,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("wrong token type: expected {expected}, found {found}")]
    WrongTokenType {
        expected: &'static str,
        found: String,
    },

    #[error("token key version no longer current")]
    VersionMismatch,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for CustosError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => CustosError::Crypto(msg),
            other => CustosError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
