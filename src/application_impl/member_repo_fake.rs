use crate::application_port::AuthError;
use crate::domain_model::{MemberId, MemberRole};
use crate::domain_port::{MemberRepo, MemberRecord};
use chrono::Utc;
use std::sync::Mutex;

// Minimal fake for development and tests; ids are handed out
// sequentially like the real table's auto-increment column.
#[derive(Default)]
pub struct FakeMemberRepo {
    members: Mutex<Vec<MemberRecord>>,
}

impl FakeMemberRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a member directly, bypassing signup. Test helper.
    pub fn insert(&self, record: MemberRecord) {
        self.members.lock().unwrap().push(record);
    }
}

#[async_trait::async_trait]
impl MemberRepo for FakeMemberRepo {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: &str,
    ) -> Result<MemberRecord, AuthError> {
        let mut members = self.members.lock().unwrap();
        let record = MemberRecord {
            member_id: MemberId(members.len() as i64 + 1),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            company_name: company_name.to_string(),
            role: MemberRole::User,
            created_at: Utc::now(),
        };
        members.push(record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<MemberRecord>, AuthError> {
        let members = self.members.lock().unwrap();
        Ok(members.iter().find(|m| m.email == email).cloned())
    }

    async fn find_by_id(&self, member: MemberId) -> Result<Option<MemberRecord>, AuthError> {
        let members = self.members.lock().unwrap();
        Ok(members.iter().find(|m| m.member_id == member).cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let members = self.members.lock().unwrap();
        Ok(members.iter().any(|m| m.email == email))
    }
}
