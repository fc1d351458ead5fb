use crate::application_port::AuthError;
use crate::domain_model::MemberId;
use crate::domain_port::SessionStore;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// In-memory stand-in for the Redis session store. Entries carry the
/// same TTL semantics (expiry checked on read, zero-TTL revocations are
/// dropped). Uses tokio's clock so tests can pause and advance time.
#[derive(Default)]
pub struct FakeSessionStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: HashMap<MemberId, Entry>,
    bl_access: HashMap<String, Instant>,
    bl_refresh: HashMap<String, Instant>,
}

struct Entry {
    jti: String,
    expires_at: Instant,
}

impl FakeSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(expires_at: Instant) -> bool {
        Instant::now() < expires_at
    }
}

#[async_trait::async_trait]
impl SessionStore for FakeSessionStore {
    async fn save_current_refresh(
        &self,
        member: MemberId,
        jti: &str,
        ttl: Duration,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().unwrap();
        inner.current.insert(
            member,
            Entry {
                jti: jti.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn current_refresh_jti(&self, member: MemberId) -> Result<Option<String>, AuthError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .current
            .get(&member)
            .filter(|e| Self::live(e.expires_at))
            .map(|e| e.jti.clone()))
    }

    async fn revoke_access(&self, jti: &str, ttl: Duration) -> Result<(), AuthError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let mut inner = self.inner.lock().unwrap();
        inner.bl_access.insert(jti.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn revoke_refresh(&self, jti: &str, ttl: Duration) -> Result<(), AuthError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let mut inner = self.inner.lock().unwrap();
        inner.bl_refresh.insert(jti.to_string(), Instant::now() + ttl);
        Ok(())
    }

    async fn is_access_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bl_access.get(jti).is_some_and(|e| Self::live(*e)))
    }

    async fn is_refresh_revoked(&self, jti: &str) -> Result<bool, AuthError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.bl_refresh.get(jti).is_some_and(|e| Self::live(*e)))
    }

    async fn clear_current_refresh(&self, member: MemberId) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().unwrap();
        inner.current.remove(&member);
        Ok(())
    }
}
