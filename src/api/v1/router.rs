use super::error::{ApiError, ApiErrorCode};
use super::gate::RequestGate;
use super::handler;
use crate::domain_model::{MemberRole, PrincipalContext};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::path::FullPath;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path("auths"))
        .and(warp::path("signup"))
        .and(warp::path::end())
        .and(with_gate(server.request_gate.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let sign_in = warp::post()
        .and(warp::path("auths"))
        .and(warp::path("sign-in"))
        .and(warp::path::end())
        .and(with_gate(server.request_gate.clone()))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::sign_in);

    let logout = warp::post()
        .and(warp::path("auths"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_gate(server.request_gate.clone()))
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_str(),
        ))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let reissue = warp::post()
        .and(warp::path("auths"))
        .and(warp::path("token-reissue"))
        .and(warp::path::end())
        .and(with_gate(server.request_gate.clone()))
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_str(),
        ))
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::reissue);

    let me = warp::get()
        .and(warp::path("members"))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(require_roles(
            server.request_gate.clone(),
            &[MemberRole::User, MemberRole::Admin],
        ))
        .and_then(handler::me);

    signup.or(sign_in).or(logout).or(reissue).or(me)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// Run the request gate: classify the path, extract and validate the
/// credential, and yield the principal context (or none on EXCLUDE and
/// OPTIONAL outcomes). REQUIRED failures reject with the path attached.
pub fn with_gate(
    gate: Arc<RequestGate>,
) -> impl Filter<Extract = (Option<PrincipalContext>,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(warp::header::optional::<String>(
            http::header::AUTHORIZATION.as_str(),
        ))
        .and(warp::header::optional::<String>(
            http::header::COOKIE.as_str(),
        ))
        .and(with(gate))
        .and_then(
            |method: http::Method,
             path: FullPath,
             authorization: Option<String>,
             cookie: Option<String>,
             gate: Arc<RequestGate>| async move {
                gate.authenticate(
                    method.as_str(),
                    path.as_str(),
                    authorization.as_deref(),
                    cookie.as_deref(),
                )
                .await
                .map_err(reject::custom)
            },
        )
}

/// Declared-roles check on top of the gate. Replaces the original's
/// annotation-driven aspect with plain filter composition: the allowed
/// set is data on the route registration and the decision reads the
/// principal context published by the gate.
pub fn require_roles(
    gate: Arc<RequestGate>,
    allowed: &'static [MemberRole],
) -> impl Filter<Extract = (PrincipalContext,), Error = warp::Rejection> + Clone {
    with_gate(gate).and_then(move |principal: Option<PrincipalContext>| async move {
        let principal =
            principal.ok_or_else(|| ApiError::reject(ApiErrorCode::Unauthorized))?;
        if !allowed.is_empty() && !allowed.contains(&principal.role) {
            return Err(ApiError::reject(ApiErrorCode::Forbidden));
        }
        Ok::<_, warp::Rejection>(principal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::gate::{GateConfig, PathClass, PathPolicy};
    use crate::api::v1::recover_error;
    use crate::application_impl::{
        Argon2PasswordHasher, FakeMemberRepo, FakeSessionStore, JwtTokenCodec, RealAuthService,
        TokenCodecConfig,
    };
    use crate::application_port::{AuthService, TokenCodec};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::Value;
    use std::time::Duration;
    use warp::http::StatusCode;

    fn test_server() -> (Arc<Server>, Arc<dyn TokenCodec>) {
        let repo = Arc::new(FakeMemberRepo::new());
        let hasher = Arc::new(Argon2PasswordHasher);
        let codec: Arc<dyn TokenCodec> = Arc::new(
            JwtTokenCodec::new(TokenCodecConfig {
                access_secret_b64: BASE64.encode(b"access-secret-for-tests-0123456789"),
                refresh_secret_b64: BASE64.encode(b"refresh-secret-for-tests-0123456789"),
                access_ttl: Duration::from_secs(30 * 60),
                refresh_ttl: Duration::from_secs(14 * 24 * 60 * 60),
            })
            .unwrap(),
        );
        let store = Arc::new(FakeSessionStore::new());

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            repo,
            hasher,
            codec.clone(),
            store.clone(),
        ));
        let policy = PathPolicy::new(
            &["/auths/**".to_string()],
            &[],
            &["/members/**".to_string()],
            PathClass::Required,
        );
        let gate = Arc::new(RequestGate::new(
            codec.clone(),
            store,
            policy,
            GateConfig {
                context_path: "/api/v1".to_string(),
                exclude_methods: vec!["OPTIONS".to_string()],
                cookie_fallback: false,
                at_cookie: "Access-Token".to_string(),
            },
        ));

        (Arc::new(Server::from_parts(auth_service, gate)), codec)
    }

    fn api(
        server: Arc<Server>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone
    {
        warp::path("api")
            .and(warp::path("v1"))
            .and(routes(server))
            .recover(recover_error)
    }

    async fn sign_up_and_in(server: &Arc<Server>) -> Value {
        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auths/signup")
            .json(&serde_json::json!({
                "email": "alice@example.com",
                "password": "correct-horse",
                "name": "Alice",
                "company_name": "ACME"
            }))
            .reply(&api(server.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auths/sign-in")
            .json(&serde_json::json!({
                "email": "alice@example.com",
                "password": "correct-horse"
            }))
            .reply(&api(server.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        serde_json::from_slice::<Value>(res.body()).unwrap()["data"].clone()
    }

    #[tokio::test]
    async fn required_path_needs_a_token() {
        let (server, _) = test_server();

        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/members/me")
            .reply(&api(server))
            .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "TOKEN_REQUIRED");
        assert_eq!(body["path"], "/api/v1/members/me");
    }

    #[tokio::test]
    async fn me_returns_the_principal_published_by_the_gate() {
        let (server, _) = test_server();
        let session = sign_up_and_in(&server).await;
        let at = session["access_token"].as_str().unwrap();

        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/members/me")
            .header("authorization", format!("Bearer {at}"))
            .reply(&api(server))
            .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["data"]["role"], "USER");
    }

    #[tokio::test]
    async fn broken_token_surfaces_as_generic_authentication_failure() {
        let (server, _) = test_server();

        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/members/me")
            .header("authorization", "Bearer not.a.jwt")
            .reply(&api(server))
            .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "AUTHENTICATION_FAILED");
    }

    #[tokio::test]
    async fn role_outside_the_allowed_set_is_forbidden() {
        let (server, codec) = test_server();
        let issued = codec
            .issue_access(crate::domain_model::MemberId(1), MemberRole::User)
            .await
            .unwrap();

        let admin_only = warp::path("admin")
            .and(require_roles(
                server.request_gate.clone(),
                &[MemberRole::Admin],
            ))
            .and_then(handler::me)
            .recover(recover_error);

        let res = warp::test::request()
            .method("GET")
            .path("/admin")
            .header("authorization", format!("Bearer {}", issued.token))
            .reply(&admin_only)
            .await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reissue_rotates_and_rejects_the_replayed_token() {
        let (server, _) = test_server();
        let session = sign_up_and_in(&server).await;
        let rt = session["refresh_token"].as_str().unwrap();

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auths/token-reissue")
            .json(&serde_json::json!({ "refresh_token": rt }))
            .reply(&api(server.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let rotated: Value = serde_json::from_slice(res.body()).unwrap();
        assert_ne!(rotated["data"]["refresh_token"].as_str().unwrap(), rt);

        // Replaying the rotated-away token is rejected and logged as a
        // probable theft event.
        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auths/token-reissue")
            .json(&serde_json::json!({ "refresh_token": rt }))
            .reply(&api(server))
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "REFRESH_TOKEN_REVOKED");
    }

    #[tokio::test]
    async fn logout_invalidates_the_access_token_for_the_gate() {
        let (server, _) = test_server();
        let session = sign_up_and_in(&server).await;
        let at = session["access_token"].as_str().unwrap().to_string();
        let rt = session["refresh_token"].as_str().unwrap().to_string();

        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/auths/logout")
            .header("authorization", format!("Bearer {at}"))
            .json(&serde_json::json!({ "refresh_token": rt }))
            .reply(&api(server.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        // The blacklisted access token no longer passes the gate even
        // though its signature and expiry are still valid.
        let res = warp::test::request()
            .method("GET")
            .path("/api/v1/members/me")
            .header("authorization", format!("Bearer {at}"))
            .reply(&api(server))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "AUTHENTICATION_FAILED");
    }
}
