use crate::application_port::{
    AuthError, AuthService, AuthTokens, CredentialHasher, MemberSummary, SignInInput,
    SignInResult, SignupInput, TokenCodec,
};
use crate::domain_port::{MemberRepo, SessionStore};
use crate::logger::*;
use std::sync::Arc;

/// Session lifecycle over the token codec and the session store.
///
/// The single-active-refresh-token invariant is enforced here: at most
/// one refresh jti is "current" per member, and every sign-in or
/// successful reissue overwrites it. Comparing the presented jti
/// against the stored one is what turns a stolen-but-valid refresh
/// token into a detectable anomaly.
///
/// The multi-step logout/reissue sequences run against the store
/// without transactions. A crash mid-sequence can leave the refresh jti
/// revoked with the session slot still set (the next attempt fails with
/// `RefreshTokenRevoked`, a safe outcome) but never the reverse, since
/// revocation is written before the slot is cleared.
pub struct RealAuthService {
    member_repo: Arc<dyn MemberRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
}

impl RealAuthService {
    pub fn new(
        member_repo: Arc<dyn MemberRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            member_repo,
            credential_hasher,
            token_codec,
            session_store,
        }
    }

    fn non_blank(token: Option<&str>) -> Option<&str> {
        token.map(str::trim).filter(|t| !t.is_empty())
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, input: SignupInput) -> Result<MemberSummary, AuthError> {
        let email = input.email.trim();

        if self.member_repo.email_exists(email).await? {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.credential_hasher.hash_password(&input.password).await?;
        let record = self
            .member_repo
            .create(email, &password_hash, input.name.trim(), input.company_name.trim())
            .await?;

        Ok(MemberSummary {
            member_id: record.member_id,
            email: record.email,
            name: record.name,
            role: record.role,
        })
    }

    async fn sign_in(&self, input: SignInInput) -> Result<SignInResult, AuthError> {
        let member = self
            .member_repo
            .find_by_email(input.email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let ok = self
            .credential_hasher
            .verify_password(&input.password, &member.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let access = self
            .token_codec
            .issue_access(member.member_id, member.role)
            .await?;
        let refresh = self.token_codec.issue_refresh(member.member_id).await?;

        self.session_store
            .save_current_refresh(member.member_id, &refresh.jti, refresh.remaining_ttl())
            .await?;

        debug!(member = %member.member_id, "sign-in: session registered");

        Ok(SignInResult {
            member_id: member.member_id,
            tokens: AuthTokens {
                access_ttl_ms: access.remaining_ttl().as_millis() as u64,
                refresh_ttl_ms: refresh.remaining_ttl().as_millis() as u64,
                access_token: access.token,
                refresh_token: refresh.token,
            },
        })
    }

    async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let rt = self.token_codec.parse_refresh(refresh_token).await?;

        if self.session_store.is_refresh_revoked(&rt.jti).await? {
            warn!(member = %rt.member_id, "logout with an already-revoked refresh token");
            return Err(AuthError::RefreshTokenRevoked);
        }

        let stored = self
            .session_store
            .current_refresh_jti(rt.member_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if stored != rt.jti {
            // Theft checkpoint: the token verifies but is no longer the
            // member's current one.
            warn!(member = %rt.member_id, "refresh jti mismatch on logout");
            return Err(AuthError::SessionMismatch);
        }

        self.session_store
            .revoke_refresh(&rt.jti, rt.remaining_ttl())
            .await?;

        if let Some(at) = Self::non_blank(access_token) {
            let at = self.token_codec.parse_access(at).await?;
            self.session_store
                .revoke_access(&at.jti, at.remaining_ttl())
                .await?;
        }

        self.session_store.clear_current_refresh(rt.member_id).await?;

        info!(member = %rt.member_id, "session terminated");
        Ok(())
    }

    async fn reissue(
        &self,
        access_token: Option<&str>,
        refresh_token: &str,
    ) -> Result<SignInResult, AuthError> {
        let rt = self.token_codec.parse_refresh(refresh_token).await?;

        if self.session_store.is_refresh_revoked(&rt.jti).await? {
            // Replay of a rotated-away token: the strongest theft signal
            // this subsystem produces.
            error!(member = %rt.member_id, "revoked refresh token replayed on reissue");
            return Err(AuthError::RefreshTokenRevoked);
        }

        let stored = self
            .session_store
            .current_refresh_jti(rt.member_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        if stored != rt.jti {
            warn!(member = %rt.member_id, "refresh jti mismatch on reissue");
            return Err(AuthError::SessionMismatch);
        }

        if let Some(at) = Self::non_blank(access_token) {
            let at = self.token_codec.parse_access(at).await?;
            if self.session_store.is_access_revoked(&at.jti).await? {
                warn!(member = %rt.member_id, "revoked access token presented on reissue");
                return Err(AuthError::AccessTokenRevoked);
            }
            self.session_store
                .revoke_access(&at.jti, at.remaining_ttl())
                .await?;
        }

        // Rotation invalidates the presented refresh token even on
        // success; it is never reusable again.
        self.session_store
            .revoke_refresh(&rt.jti, rt.remaining_ttl())
            .await?;
        self.session_store.clear_current_refresh(rt.member_id).await?;

        let member = self
            .member_repo
            .find_by_id(rt.member_id)
            .await?
            .ok_or(AuthError::MemberNotFound)?;

        let access = self
            .token_codec
            .issue_access(member.member_id, member.role)
            .await?;
        let refresh = self.token_codec.issue_refresh(member.member_id).await?;

        self.session_store
            .save_current_refresh(member.member_id, &refresh.jti, refresh.remaining_ttl())
            .await?;

        info!(member = %member.member_id, "refresh token rotated");

        Ok(SignInResult {
            member_id: member.member_id,
            tokens: AuthTokens {
                access_ttl_ms: access.remaining_ttl().as_millis() as u64,
                refresh_ttl_ms: refresh.remaining_ttl().as_millis() as u64,
                access_token: access.token,
                refresh_token: refresh.token,
            },
        })
    }
}
