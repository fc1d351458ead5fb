use crate::application_port::AuthError;
use crate::domain_model::MemberId;
use std::time::Duration;

/// External TTL-capable key-value cache backing session bookkeeping.
///
/// Holds the single-slot registry (member -> currently valid refresh
/// jti) and the two blacklists (access jtis, refresh jtis). Operations
/// are individually atomic at the key level but never combined into
/// multi-key transactions; the lifecycle's multi-step protocols are
/// best-effort (see the race notes in `auth_service_impl`).
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditionally overwrite the member's current refresh jti.
    /// The TTL bounds the record to the refresh token's lifetime.
    async fn save_current_refresh(
        &self,
        member: MemberId,
        jti: &str,
        ttl: Duration,
    ) -> Result<(), AuthError>;

    /// Absence means "no active session", not "revoked".
    async fn current_refresh_jti(&self, member: MemberId) -> Result<Option<String>, AuthError>;

    /// Blacklist an access jti for the token's remaining lifetime.
    /// A zero TTL is a no-op: natural expiry already rejects the token.
    async fn revoke_access(&self, jti: &str, ttl: Duration) -> Result<(), AuthError>;

    /// Blacklist a refresh jti. Zero TTL is a no-op, as above.
    async fn revoke_refresh(&self, jti: &str, ttl: Duration) -> Result<(), AuthError>;

    async fn is_access_revoked(&self, jti: &str) -> Result<bool, AuthError>;

    async fn is_refresh_revoked(&self, jti: &str) -> Result<bool, AuthError>;

    async fn clear_current_refresh(&self, member: MemberId) -> Result<(), AuthError>;
}
