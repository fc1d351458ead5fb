use crate::api::v1::error::{ApiError, ApiErrorCode};
use crate::application_port::{AuthError, TokenCodec};
use crate::domain_model::PrincipalContext;
use crate::domain_port::SessionStore;
use crate::logger::*;
use crate::settings::Filter as FilterSettings;
use std::sync::Arc;

const AUTH_HEADER_BEARER: &str = "Bearer ";

/// Authentication requirement of a path.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PathClass {
    Exclude,
    Optional,
    Required,
}

impl PathClass {
    /// Default-policy values; only the two fallback classes are legal.
    pub fn parse_default(raw: &str) -> Option<PathClass> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exclude" => Some(PathClass::Exclude),
            "required" => Some(PathClass::Required),
            _ => None,
        }
    }
}

/// Segment glob compiled from a pattern string. `*` matches exactly one
/// segment; a trailing `**` matches any remainder, including none, so
/// `/foo/**` also matches `/foo` itself. Trailing slashes are
/// insignificant: `/foo/` and `/foo` compile identically.
#[derive(Debug, Clone)]
struct PathPattern {
    segs: Vec<Seg>,
}

#[derive(Debug, Clone)]
enum Seg {
    Literal(String),
    One,
    Rest,
}

impl PathPattern {
    fn parse(raw: &str) -> PathPattern {
        let segs = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "**" => Seg::Rest,
                "*" => Seg::One,
                lit => Seg::Literal(lit.to_string()),
            })
            .collect();
        PathPattern { segs }
    }

    fn matches(&self, path_segs: &[&str]) -> bool {
        Self::match_segs(&self.segs, path_segs)
    }

    fn match_segs(pat: &[Seg], path: &[&str]) -> bool {
        match pat.split_first() {
            None => path.is_empty(),
            Some((Seg::Rest, _)) => true,
            Some((Seg::One, rest)) => {
                !path.is_empty() && Self::match_segs(rest, &path[1..])
            }
            Some((Seg::Literal(lit), rest)) => {
                path.first().is_some_and(|s| s == lit) && Self::match_segs(rest, &path[1..])
            }
        }
    }
}

/// Ordered rule sets with fixed precedence:
/// EXCLUDE > OPTIONAL > REQUIRED > default policy.
pub struct PathPolicy {
    exclude: Vec<PathPattern>,
    optional: Vec<PathPattern>,
    include: Vec<PathPattern>,
    default: PathClass,
}

impl PathPolicy {
    pub fn new(
        exclude: &[String],
        optional: &[String],
        include: &[String],
        default: PathClass,
    ) -> Self {
        let compile = |raws: &[String]| raws.iter().map(|r| PathPattern::parse(r)).collect();
        PathPolicy {
            exclude: compile(exclude),
            optional: compile(optional),
            include: compile(include),
            default,
        }
    }

    pub fn classify(&self, path: &str) -> PathClass {
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if Self::matches_any(&self.exclude, &segs) {
            return PathClass::Exclude;
        }
        if Self::matches_any(&self.optional, &segs) {
            return PathClass::Optional;
        }
        if Self::matches_any(&self.include, &segs) {
            return PathClass::Required;
        }
        self.default
    }

    fn matches_any(patterns: &[PathPattern], segs: &[&str]) -> bool {
        patterns.iter().any(|p| p.matches(segs))
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub context_path: String,
    pub exclude_methods: Vec<String>,
    pub cookie_fallback: bool,
    pub at_cookie: String,
}

/// Per-request policy classifier and credential validator.
///
/// State machine per request: classify -> extract -> one of
/// {reject, optional-pass, required-validate}. On REQUIRED paths every
/// validation failure collapses into `AuthenticationFailed`; the
/// specific reason is logged but never surfaced, so callers cannot use
/// the gate as an oracle. OPTIONAL paths never fail: a broken or
/// revoked token simply yields no principal context.
pub struct RequestGate {
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    policy: PathPolicy,
    config: GateConfig,
}

impl RequestGate {
    pub fn new(
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        policy: PathPolicy,
        config: GateConfig,
    ) -> Self {
        RequestGate {
            token_codec,
            session_store,
            policy,
            config,
        }
    }

    pub fn from_settings(
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        settings: &FilterSettings,
    ) -> anyhow::Result<Self> {
        let default = PathClass::parse_default(&settings.default_policy).ok_or_else(|| {
            anyhow::anyhow!("unknown default policy: {}", settings.default_policy)
        })?;
        let policy = PathPolicy::new(
            &settings.exclude_path_patterns,
            &settings.optional_path_patterns,
            &settings.include_path_patterns,
            default,
        );
        Ok(Self::new(
            token_codec,
            session_store,
            policy,
            GateConfig {
                context_path: settings.context_path.clone(),
                exclude_methods: settings.exclude_methods.clone(),
                cookie_fallback: settings.cookie_fallback,
                at_cookie: settings.at_cookie.clone(),
            },
        ))
    }

    pub async fn authenticate(
        &self,
        method: &str,
        path: &str,
        authorization: Option<&str>,
        cookie_header: Option<&str>,
    ) -> Result<Option<PrincipalContext>, ApiError> {
        // Method exemptions (pre-flight and the like) short-circuit
        // before any path classification.
        if self
            .config
            .exclude_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
        {
            return Ok(None);
        }

        let stripped = strip_context_path(path, &self.config.context_path);

        match self.policy.classify(stripped) {
            PathClass::Exclude => {
                trace!(path, "EXCLUDE path, passing through");
                Ok(None)
            }
            PathClass::Required => {
                let Some(token) = self.extract(authorization, cookie_header) else {
                    return Err(ApiError::at_path(ApiErrorCode::TokenRequired, path));
                };
                match self.validate(&token).await {
                    Ok(ctx) => {
                        debug!(member = %ctx.member_id, role = %ctx.role, path, "authenticated");
                        Ok(Some(ctx))
                    }
                    Err(e @ (AuthError::Store(_) | AuthError::Internal(_))) => {
                        warn!(%e, path, "session store unavailable during validation");
                        Err(ApiError::at_path(ApiErrorCode::InternalError, path))
                    }
                    Err(e) => {
                        // The specific kind stays in the log; the caller
                        // only ever sees the generic failure.
                        warn!(%e, path, "access token rejected on required path");
                        Err(ApiError::at_path(ApiErrorCode::AuthenticationFailed, path))
                    }
                }
            }
            PathClass::Optional => {
                let Some(token) = self.extract(authorization, cookie_header) else {
                    return Ok(None);
                };
                match self.validate(&token).await {
                    Ok(ctx) => Ok(Some(ctx)),
                    Err(e) => {
                        debug!(%e, path, "token ignored on optional path");
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Header first, cookie fallback second. A header that carries the
    /// bearer prefix with an empty remainder yields nothing; a header
    /// without the prefix falls through to the cookie.
    fn extract(&self, authorization: Option<&str>, cookie_header: Option<&str>) -> Option<String> {
        if let Some(header) = authorization.map(str::trim).filter(|h| !h.is_empty()) {
            // char-boundary-safe: header values are not guaranteed ASCII
            if let Some(prefix) = header.get(..AUTH_HEADER_BEARER.len()) {
                if prefix.eq_ignore_ascii_case(AUTH_HEADER_BEARER) {
                    let token = header[AUTH_HEADER_BEARER.len()..].trim();
                    return if token.is_empty() {
                        None
                    } else {
                        Some(token.to_string())
                    };
                }
            }
        }

        if self.config.cookie_fallback {
            if let Some(cookies) = cookie_header {
                return find_cookie(cookies, &self.config.at_cookie);
            }
        }
        None
    }

    async fn validate(&self, token: &str) -> Result<PrincipalContext, AuthError> {
        let claims = self.token_codec.parse_access(token).await?;
        if self.session_store.is_access_revoked(&claims.jti).await? {
            return Err(AuthError::AccessTokenRevoked);
        }
        Ok(PrincipalContext::new(claims.member_id, claims.role))
    }
}

fn strip_context_path<'a>(path: &'a str, context: &str) -> &'a str {
    if !context.is_empty() {
        if let Some(rest) = path.strip_prefix(context) {
            return rest;
        }
    }
    path
}

fn find_cookie(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k.trim() == name {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{FakeSessionStore, JwtTokenCodec, TokenCodecConfig};
    use crate::domain_model::{MemberId, MemberRole};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use std::time::Duration;

    fn codec() -> Arc<dyn TokenCodec> {
        Arc::new(
            JwtTokenCodec::new(TokenCodecConfig {
                access_secret_b64: BASE64.encode(b"access-secret-for-tests-0123456789"),
                refresh_secret_b64: BASE64.encode(b"refresh-secret-for-tests-0123456789"),
                access_ttl: Duration::from_secs(30 * 60),
                refresh_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            })
            .unwrap(),
        )
    }

    fn policy(
        exclude: &[&str],
        optional: &[&str],
        include: &[&str],
        default: PathClass,
    ) -> PathPolicy {
        let owned = |raws: &[&str]| raws.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PathPolicy::new(
            &owned(exclude),
            &owned(optional),
            &owned(include),
            default,
        )
    }

    fn gate_with(policy: PathPolicy, store: Arc<FakeSessionStore>) -> RequestGate {
        RequestGate::new(
            codec(),
            store,
            policy,
            GateConfig {
                context_path: "/api/v1".to_string(),
                exclude_methods: vec!["OPTIONS".to_string()],
                cookie_fallback: false,
                at_cookie: "Access-Token".to_string(),
            },
        )
    }

    fn default_gate() -> RequestGate {
        gate_with(
            policy(
                &["/auths/**"],
                &["/gatherings/*/preview"],
                &["/members/**"],
                PathClass::Required,
            ),
            Arc::new(FakeSessionStore::new()),
        )
    }

    #[test]
    fn wildcard_pattern_also_matches_its_parent() {
        let p = PathPattern::parse("/foo/**");
        assert!(p.matches(&["foo", "bar", "baz"]));
        assert!(p.matches(&["foo"]));
        assert!(!p.matches(&["foobar"]));
    }

    #[test]
    fn trailing_slash_pattern_matches_without_it() {
        let p = PathPattern::parse("/foo/");
        assert!(p.matches(&["foo"]));
        assert!(!p.matches(&["foo", "bar"]));
    }

    #[test]
    fn single_star_matches_exactly_one_segment() {
        let p = PathPattern::parse("/gatherings/*/preview");
        assert!(p.matches(&["gatherings", "42", "preview"]));
        assert!(!p.matches(&["gatherings", "preview"]));
        assert!(!p.matches(&["gatherings", "42", "43", "preview"]));
    }

    #[test]
    fn exclude_wins_over_overlapping_optional_and_required() {
        // All three sets match "/both/x"; EXCLUDE must win regardless
        // of declaration order.
        let p = policy(
            &["/both/**"],
            &["/both/**"],
            &["/both/**"],
            PathClass::Required,
        );
        assert_eq!(p.classify("/both/x"), PathClass::Exclude);

        let p = policy(&[], &["/both/**"], &["/both/**"], PathClass::Required);
        assert_eq!(p.classify("/both/x"), PathClass::Optional);

        let p = policy(&[], &[], &["/both/**"], PathClass::Exclude);
        assert_eq!(p.classify("/both/x"), PathClass::Required);
    }

    #[test]
    fn unmatched_path_falls_back_to_default_policy() {
        let p = policy(&["/auths/**"], &[], &[], PathClass::Required);
        assert_eq!(p.classify("/anything/else"), PathClass::Required);

        let p = policy(&["/auths/**"], &[], &[], PathClass::Exclude);
        assert_eq!(p.classify("/anything/else"), PathClass::Exclude);
    }

    #[tokio::test]
    async fn exempted_method_passes_before_classification() {
        let gate = default_gate();
        // "/api/v1/members/me" is REQUIRED, but OPTIONS is exempt.
        let ctx = gate
            .authenticate("OPTIONS", "/api/v1/members/me", None, None)
            .await
            .unwrap();
        assert_eq!(ctx, None);
    }

    #[tokio::test]
    async fn exclude_path_passes_without_extraction() {
        let gate = default_gate();
        let ctx = gate
            .authenticate(
                "POST",
                "/api/v1/auths/sign-in",
                Some("Bearer utterly-broken"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(ctx, None);
    }

    #[tokio::test]
    async fn required_path_without_credential_is_token_required() {
        let gate = default_gate();
        let err = gate
            .authenticate("GET", "/api/v1/members/me", None, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::TokenRequired);
        assert_eq!(err.path.as_deref(), Some("/api/v1/members/me"));
    }

    #[tokio::test]
    async fn required_path_collapses_parse_failures() {
        let gate = default_gate();
        // Expired, tampered, malformed: the boundary only ever reports
        // the generic failure.
        let err = gate
            .authenticate(
                "GET",
                "/api/v1/members/me",
                Some("Bearer not-a-jwt"),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn required_path_accepts_a_valid_token() {
        let gate = default_gate();
        let issued = gate
            .token_codec
            .issue_access(MemberId(42), MemberRole::Admin)
            .await
            .unwrap();

        let ctx = gate
            .authenticate(
                "GET",
                "/api/v1/members/me",
                Some(&format!("Bearer {}", issued.token)),
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.member_id, MemberId(42));
        assert_eq!(ctx.role, MemberRole::Admin);
    }

    #[tokio::test]
    async fn required_path_rejects_a_blacklisted_token() {
        let store = Arc::new(FakeSessionStore::new());
        let gate = gate_with(
            policy(&[], &[], &["/members/**"], PathClass::Required),
            store.clone(),
        );
        let issued = gate
            .token_codec
            .issue_access(MemberId(1), MemberRole::User)
            .await
            .unwrap();
        store
            .revoke_access(&issued.jti, Duration::from_secs(60))
            .await
            .unwrap();

        let err = gate
            .authenticate(
                "GET",
                "/api/v1/members/me",
                Some(&format!("Bearer {}", issued.token)),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn optional_path_swallows_a_broken_token() {
        let gate = gate_with(
            policy(&[], &["/gatherings/**"], &[], PathClass::Required),
            Arc::new(FakeSessionStore::new()),
        );

        let ctx = gate
            .authenticate(
                "GET",
                "/api/v1/gatherings/7",
                Some("Bearer tampered.garbage.token"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(ctx, None);
    }

    #[tokio::test]
    async fn optional_path_publishes_context_for_a_valid_token() {
        let gate = gate_with(
            policy(&[], &["/gatherings/**"], &[], PathClass::Required),
            Arc::new(FakeSessionStore::new()),
        );
        let issued = gate
            .token_codec
            .issue_access(MemberId(8), MemberRole::User)
            .await
            .unwrap();

        let ctx = gate
            .authenticate(
                "GET",
                "/api/v1/gatherings/7",
                Some(&format!("Bearer {}", issued.token)),
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.member_id, MemberId(8));
    }

    #[tokio::test]
    async fn cookie_fallback_is_used_only_when_enabled() {
        let store = Arc::new(FakeSessionStore::new());
        let mut gate = gate_with(
            policy(&[], &[], &["/members/**"], PathClass::Required),
            store.clone(),
        );
        let issued = gate
            .token_codec
            .issue_access(MemberId(5), MemberRole::User)
            .await
            .unwrap();
        let cookies = format!("theme=dark; Access-Token={}", issued.token);

        // Disabled: the cookie is ignored.
        let err = gate
            .authenticate("GET", "/api/v1/members/me", None, Some(&cookies))
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::TokenRequired);

        gate.config.cookie_fallback = true;
        let ctx = gate
            .authenticate("GET", "/api/v1/members/me", None, Some(&cookies))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ctx.member_id, MemberId(5));
    }

    #[tokio::test]
    async fn bearer_header_with_empty_remainder_counts_as_missing() {
        let gate = default_gate();
        let err = gate
            .authenticate("GET", "/api/v1/members/me", Some("Bearer   "), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::TokenRequired);
    }

    #[tokio::test]
    async fn multibyte_header_value_is_treated_as_no_credential() {
        let gate = default_gate();
        // Not bearer-prefixed, and its bytes straddle the prefix length.
        let err = gate
            .authenticate("GET", "/api/v1/members/me", Some("αβγδεζη"), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::TokenRequired);
    }
}
