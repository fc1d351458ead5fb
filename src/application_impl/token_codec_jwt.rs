use crate::application_port::{
    AccessTokenClaims, IssuedToken, RefreshTokenClaims, TokenCodec, TokenError,
};
use crate::domain_model::{MemberId, MemberRole};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";
const CLAIM_USER_ROLE: &str = "USER_ROLE";
const CLOCK_SKEW_SECS: u64 = 120;

/// Signing configuration, constructed once at startup from settings and
/// handed to the codec by value. Secrets are base64-encoded HMAC keys;
/// access and refresh tokens use distinct keys so one class can never
/// verify as the other.
#[derive(Debug, Clone)]
pub struct TokenCodecConfig {
    pub access_secret_b64: String,
    pub refresh_secret_b64: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

struct KeySet {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeySet {
    fn from_b64(secret_b64: &str) -> anyhow::Result<Self> {
        let raw = BASE64.decode(secret_b64.trim())?;
        Ok(KeySet {
            encoding: EncodingKey::from_secret(&raw),
            decoding: DecodingKey::from_secret(&raw),
        })
    }
}

pub struct JwtTokenCodec {
    access: KeySet,
    refresh: KeySet,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaimsRepr {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
    #[serde(rename = "USER_ROLE")]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaimsRepr {
    sub: String,
    jti: String,
    iat: i64,
    exp: i64,
}

impl JwtTokenCodec {
    pub fn new(config: TokenCodecConfig) -> anyhow::Result<Self> {
        Ok(JwtTokenCodec {
            access: KeySet::from_b64(&config.access_secret_b64)?,
            refresh: KeySet::from_b64(&config.refresh_secret_b64)?,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        })
    }

    #[inline]
    fn new_jti() -> String {
        Uuid::new_v4().to_string()
    }

    fn encode<T: Serialize>(&self, claims: &T, keys: &KeySet) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
            .map_err(|_| TokenError::Malformed)
    }

    fn decode<T: DeserializeOwned>(token: &str, keys: &KeySet) -> Result<T, TokenError> {
        let stripped = strip_bearer(token)?;

        let header = jsonwebtoken::decode_header(stripped).map_err(map_jwt_error)?;
        if let Some(typ) = &header.typ {
            if !typ.eq_ignore_ascii_case("JWT") {
                return Err(TokenError::Unsupported);
            }
        }
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::Unsupported);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_SECS;
        validation.validate_exp = true;

        let data = jsonwebtoken::decode::<T>(stripped, &keys.decoding, &validation)
            .map_err(map_jwt_error)?;
        Ok(data.claims)
    }

    fn check_not_premature(iat: i64) -> Result<(), TokenError> {
        if iat > Utc::now().timestamp() + CLOCK_SKEW_SECS as i64 {
            return Err(TokenError::Premature);
        }
        Ok(())
    }

    fn parse_member_id(sub: &str) -> Result<MemberId, TokenError> {
        sub.parse::<MemberId>().map_err(|_| TokenError::InvalidClaims)
    }

    fn expiry(exp: i64) -> Result<DateTime<Utc>, TokenError> {
        Utc.timestamp_opt(exp, 0)
            .single()
            .ok_or(TokenError::InvalidClaims)
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtTokenCodec {
    async fn issue_access(
        &self,
        member: MemberId,
        role: MemberRole,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(self.access_ttl).unwrap_or_default();
        let jti = Self::new_jti();

        let claims = AccessClaimsRepr {
            sub: member.to_string(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            role: Some(role.as_str().to_string()),
        };
        let token = self.encode(&claims, &self.access)?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    async fn issue_refresh(&self, member: MemberId) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(self.refresh_ttl).unwrap_or_default();
        let jti = Self::new_jti();

        let claims = RefreshClaimsRepr {
            sub: member.to_string(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = self.encode(&claims, &self.refresh)?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    async fn parse_access(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let claims: AccessClaimsRepr = Self::decode(token, &self.access)?;
        Self::check_not_premature(claims.iat)?;

        let member_id = Self::parse_member_id(&claims.sub)?;
        let role = claims
            .role
            .as_deref()
            .and_then(MemberRole::parse)
            .ok_or(TokenError::InvalidClaims)?;

        Ok(AccessTokenClaims {
            member_id,
            jti: claims.jti,
            role,
            expires_at: Self::expiry(claims.exp)?,
        })
    }

    async fn parse_refresh(&self, token: &str) -> Result<RefreshTokenClaims, TokenError> {
        let claims: RefreshClaimsRepr = Self::decode(token, &self.refresh)?;
        Self::check_not_premature(claims.iat)?;

        Ok(RefreshTokenClaims {
            member_id: Self::parse_member_id(&claims.sub)?,
            jti: claims.jti,
            expires_at: Self::expiry(claims.exp)?,
        })
    }
}

/// Tolerant bearer stripping: surrounding whitespace is ignored and the
/// prefix match is case-insensitive. A prefix with an empty remainder
/// counts as a missing token. Tokens are arbitrary UTF-8 from the
/// request body, so the prefix slice must respect char boundaries.
fn strip_bearer(token: &str) -> Result<&str, TokenError> {
    let t = token.trim();
    if t.is_empty() {
        return Err(TokenError::Missing);
    }
    // "Bearer" with nothing after it trims to the bare word.
    if t.eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
        return Err(TokenError::Missing);
    }
    if let Some(prefix) = t.get(..BEARER_PREFIX.len()) {
        if prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
            let rest = t[BEARER_PREFIX.len()..].trim();
            if rest.is_empty() {
                return Err(TokenError::Missing);
            }
            return Ok(rest);
        }
    }
    Ok(t)
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind::*;
    match e.kind() {
        ExpiredSignature => TokenError::Expired,
        ImmatureSignature => TokenError::Premature,
        InvalidSignature => TokenError::Tampered,
        InvalidAlgorithm | InvalidAlgorithmName => TokenError::Unsupported,
        MissingRequiredClaim(_) => TokenError::InvalidClaims,
        _ => TokenError::Malformed,
    }
}
