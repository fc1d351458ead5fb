use crate::domain_model::{MemberId, MemberRole};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Parse failures form a closed taxonomy; each condition is distinct
/// and non-overlapping. Callers that must not leak the failing check
/// (the request gate) collapse these before surfacing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("token missing or blank")]
    Missing,
    #[error("token structure is malformed")]
    Malformed,
    #[error("unsupported token type or algorithm")]
    Unsupported,
    #[error("signature mismatch")]
    Tampered,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    Premature,
    #[error("required claim missing or invalid")]
    InvalidClaims,
}

/// A freshly minted token together with the bookkeeping the session
/// layer needs: the embedded jti and the absolute expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    pub fn remaining_ttl(&self) -> Duration {
        remaining_ttl(self.expires_at)
    }
}

#[derive(Debug, Clone)]
pub struct AccessTokenClaims {
    pub member_id: MemberId,
    pub jti: String,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
}

impl AccessTokenClaims {
    pub fn remaining_ttl(&self) -> Duration {
        remaining_ttl(self.expires_at)
    }
}

#[derive(Debug, Clone)]
pub struct RefreshTokenClaims {
    pub member_id: MemberId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenClaims {
    pub fn remaining_ttl(&self) -> Duration {
        remaining_ttl(self.expires_at)
    }
}

/// Remaining lifetime floored at zero. A token inside the clock-skew
/// window parses successfully but may already report zero here.
pub fn remaining_ttl(expires_at: DateTime<Utc>) -> Duration {
    let ms = (expires_at - Utc::now()).num_milliseconds();
    if ms <= 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(ms as u64)
    }
}

/// Signs and parses the two token classes with class-specific keys.
///
/// `parse_*` strips an optional case-insensitive `Bearer ` prefix and
/// verifies signature and expiry (with a small clock-skew allowance)
/// before extracting claims.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access(
        &self,
        member: MemberId,
        role: MemberRole,
    ) -> Result<IssuedToken, TokenError>;

    async fn issue_refresh(&self, member: MemberId) -> Result<IssuedToken, TokenError>;

    async fn parse_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError>;

    async fn parse_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError>;
}
