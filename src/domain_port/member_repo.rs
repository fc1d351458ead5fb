use crate::application_port::AuthError;
use crate::domain_model::{MemberId, MemberRole};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub member_id: MemberId,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub company_name: String,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

/// Persistent member profiles. The session subsystem only needs lookup
/// by email (sign-in), lookup by id (role refresh on reissue), and
/// creation (signup).
#[async_trait::async_trait]
pub trait MemberRepo: Send + Sync {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: &str,
    ) -> Result<MemberRecord, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<MemberRecord>, AuthError>;

    async fn find_by_id(&self, member: MemberId) -> Result<Option<MemberRecord>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;
}
