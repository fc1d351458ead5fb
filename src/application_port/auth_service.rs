use crate::application_port::TokenError;
use crate::domain_model::{MemberId, MemberRole};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailExists,
    #[error("member not found")]
    MemberNotFound,
    #[error("no active session for this member")]
    SessionNotFound,
    #[error("presented refresh token is not the current one")]
    SessionMismatch,
    #[error("access token has been revoked")]
    AccessTokenRevoked,
    #[error("refresh token has been revoked")]
    RefreshTokenRevoked,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub company_name: String,
}

#[derive(Debug, Clone)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub member_id: MemberId,
    pub email: String,
    pub name: String,
    pub role: MemberRole,
}

/// Both tokens of a session plus their lifetimes in milliseconds, as
/// returned to the client on sign-in and reissue.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInResult {
    pub member_id: MemberId,
    pub tokens: AuthTokens,
}

/// Session lifecycle: sign-in, logout, and rotate-on-refresh. The
/// implementation owns all writes to the session store.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, input: SignupInput) -> Result<MemberSummary, AuthError>;

    async fn sign_in(&self, input: SignInInput) -> Result<SignInResult, AuthError>;

    /// Terminate the session the refresh token belongs to. The access
    /// token, when supplied, is blacklisted alongside the refresh token.
    async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<(), AuthError>;

    /// Rotate: invalidate the presented refresh token and mint a new
    /// access/refresh pair. The old refresh token is never reusable
    /// again regardless of outcome.
    async fn reissue(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<SignInResult, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}
