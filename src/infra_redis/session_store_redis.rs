use crate::application_port::AuthError;
use crate::domain_model::MemberId;
use crate::domain_port::SessionStore;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Redis-backed session store. Key layout (colon-delimited, under a
/// configurable prefix, "user" by default):
///
///   {prefix}:USER:{memberId}  -> current refresh jti
///   {prefix}:BL:AT:{jti}      -> access blacklist marker
///   {prefix}:BL:RT:{jti}      -> refresh blacklist marker
///
/// Blacklist values are an opaque "1"; existence alone is the signal.
/// Every entry carries a TTL so no manual cleanup is ever needed.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn k_user(&self, member: MemberId) -> String {
        format!("{}:USER:{}", self.prefix, member)
    }

    fn k_bl_at(&self, jti: &str) -> String {
        format!("{}:BL:AT:{}", self.prefix, jti)
    }

    fn k_bl_rt(&self, jti: &str) -> String {
        format!("{}:BL:RT:{}", self.prefix, jti)
    }

    async fn set_marker(&self, key: String, ttl: Duration) -> Result<(), AuthError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(&key, "1", ttl.as_millis() as u64)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn exists(&self, key: String) -> Result<bool, AuthError> {
        let mut conn = self.conn.clone();
        conn.exists(&key)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn save_current_refresh(
        &self,
        member: MemberId,
        jti: &str,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .pset_ex(&self.k_user(member), jti, ttl.as_millis() as u64)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn current_refresh_jti(&self, member: MemberId) -> Result<Option<String>, AuthError> {
        let mut conn = self.conn.clone();
        conn.get(&self.k_user(member))
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }

    async fn revoke_access(&self, jti: &str, ttl: Duration) -> Result<(), AuthError> {
        self.set_marker(self.k_bl_at(jti), ttl).await
    }

    async fn revoke_refresh(&self, jti: &str, ttl: Duration) -> Result<(), AuthError> {
        self.set_marker(self.k_bl_rt(jti), ttl).await
    }

    async fn is_access_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        self.exists(self.k_bl_at(jti)).await
    }

    async fn is_refresh_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        self.exists(self.k_bl_rt(jti)).await
    }

    async fn clear_current_refresh(&self, member: MemberId) -> Result<(), AuthError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(&self.k_user(member))
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }
}
