use crate::application_port::AuthError;
use crate::domain_model::{MemberId, MemberRole};
use crate::domain_port::{MemberRepo, MemberRecord};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlMemberRepo {
    pool: MySqlPool,
}

impl MySqlMemberRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlMemberRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<MemberRecord, AuthError> {
        let member_id: i64 = row
            .try_get("member_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let company_name: String = row
            .try_get("company_name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let role = MemberRole::parse(&role)
            .ok_or_else(|| AuthError::Store(format!("unknown role in member row: {role}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(MemberRecord {
            member_id: MemberId(member_id),
            email,
            password_hash,
            name,
            company_name,
            role,
            created_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "member_id, email, password_hash, name, company_name, role, created_at";

#[async_trait::async_trait]
impl MemberRepo for MySqlMemberRepo {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        name: &str,
        company_name: &str,
    ) -> Result<MemberRecord, AuthError> {
        let result = sqlx::query(
            r#"
INSERT INTO member (email, password_hash, name, company_name, role)
VALUES (?, ?, ?, ?, 'USER')
"#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(company_name)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        let member_id = MemberId(result.last_insert_id() as i64);
        self.find_by_id(member_id)
            .await?
            .ok_or_else(|| AuthError::Store("member missing right after insert".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<MemberRecord>, AuthError> {
        let row_opt = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM member WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, member: MemberId) -> Result<Option<MemberRecord>, AuthError> {
        let row_opt = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM member WHERE member_id = ?"
        ))
        .bind(member.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM member WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(n > 0)
    }
}
