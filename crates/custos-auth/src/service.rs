//! Authentication service — login, token validation, refresh, and
//! key-version revocation.

use custos_core::error::{CustosError, CustosResult};
use custos_core::models::user::{User, UserStatus};
use custos_core::repository::UserRepository;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub tenant_id: Uuid,
    pub username_or_email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// An issued token pair.
#[derive(Debug)]
pub struct TokenPair {
    /// Signed JWT access token, bound to the principal's new key
    /// version.
    pub access_token: String,
    /// Signed JWT refresh token (expiry-only validity).
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// The key version embedded in the access token.
    pub key_version: u32,
}

/// Authentication service.
///
/// Generic over the user repository so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U: UserRepository> {
    user_repo: U,
    config: AuthConfig,
}

impl<U: UserRepository> AuthService<U> {
    pub fn new(user_repo: U, config: AuthConfig) -> Self {
        Self { user_repo, config }
    }

    fn check_status(user: &User) -> Result<(), AuthError> {
        match user.status {
            UserStatus::Active => Ok(()),
            UserStatus::Suspended => Err(AuthError::AccountSuspended),
            UserStatus::Disabled => Err(AuthError::AccountDisabled),
        }
    }

    /// Advance the principal's key version and issue a fresh token
    /// pair bound to the new version.
    ///
    /// The bump happens on *every* issuance, not just on revocation
    /// events: at most one access-token generation per principal is
    /// valid at a time (single-active-generation policy, pending
    /// product confirmation — see DESIGN.md).
    async fn issue_pair(&self, user: &User) -> CustosResult<TokenPair> {
        let key_version = self
            .user_repo
            .increment_key_version(user.tenant_id, user.id)
            .await?;

        let access_token =
            token::issue_access_token(user.id, user.tenant_id, key_version, &self.config)?;
        let refresh_token = token::issue_refresh_token(user.id, user.tenant_id, &self.config)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_lifetime_secs,
            key_version,
        })
    }

    /// Authenticate with username/email + password and issue tokens.
    pub async fn login(&self, input: LoginInput) -> CustosResult<TokenPair> {
        // 1. Look up user — try username first, then email.
        let user = match self
            .user_repo
            .get_by_username(input.tenant_id, &input.username_or_email)
            .await
        {
            Ok(u) => u,
            Err(CustosError::NotFound { .. }) => self
                .user_repo
                .get_by_email(input.tenant_id, &input.username_or_email)
                .await
                .map_err(|_| AuthError::InvalidCredentials)?,
            Err(e) => return Err(e),
        };

        // 2. Verify password.
        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )
        .map_err(|e| CustosError::Crypto(e.to_string()))?;

        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Check account status.
        Self::check_status(&user).map_err(CustosError::from)?;

        // 4. Issue the pair (bumps key_version).
        self.issue_pair(&user).await
    }

    /// Validate an access token and resolve the principal.
    ///
    /// Fails with `TokenExpired`, `WrongTokenType`, `TokenInvalid`, or
    /// `VersionMismatch` when the principal's current key version no
    /// longer matches the one bound into the token — the path by which
    /// role changes, logout-everywhere, and suspension propagate
    /// instantly without a revocation list.
    pub async fn validate_access(&self, access_token: &str) -> CustosResult<User> {
        let claims = token::decode_access_token(access_token, &self.config)?;

        let tenant_id = Uuid::parse_str(&claims.tenant_id)
            .map_err(|_| AuthError::TokenInvalid("malformed tenant id".into()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::TokenInvalid("malformed subject".into()))?;

        let user = match self.user_repo.get_by_id(tenant_id, user_id).await {
            Ok(u) => u,
            Err(CustosError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("unknown subject".into()).into());
            }
            Err(e) => return Err(e),
        };

        Self::check_status(&user).map_err(CustosError::from)?;

        // key_version presence is guaranteed by decode_access_token.
        if claims.key_version != Some(user.key_version) {
            return Err(AuthError::VersionMismatch.into());
        }

        Ok(user)
    }

    /// Validate a refresh token and mint a new token pair.
    ///
    /// The principal's state is re-checked from the store — existence
    /// and active status are not embedded in the refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> CustosResult<TokenPair> {
        let claims = token::decode_refresh_token(refresh_token, &self.config)?;

        let tenant_id = Uuid::parse_str(&claims.tenant_id)
            .map_err(|_| AuthError::TokenInvalid("malformed tenant id".into()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::TokenInvalid("malformed subject".into()))?;

        let user = match self.user_repo.get_by_id(tenant_id, user_id).await {
            Ok(u) => u,
            Err(CustosError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("unknown subject".into()).into());
            }
            Err(e) => return Err(e),
        };

        Self::check_status(&user).map_err(CustosError::from)?;

        self.issue_pair(&user).await
    }

    /// Invalidate every outstanding access token for the principal by
    /// advancing the key version. Returns the new version.
    pub async fn logout_everywhere(&self, tenant_id: Uuid, user_id: Uuid) -> CustosResult<u32> {
        self.user_repo
            .increment_key_version(tenant_id, user_id)
            .await
    }
}
