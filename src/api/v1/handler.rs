use crate::api::v1::error::ApiError;
use crate::application_port::{
    AuthService, MemberSummary, SignInInput, SignInResult, SignupInput,
};
use crate::domain_model::{MemberId, MemberRole, PrincipalContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub company_name: String,
}

pub async fn signup(
    _principal: Option<PrincipalContext>,
    body: SignupRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let summary: MemberSummary = auth_service
        .signup(SignupInput {
            email: body.email,
            password: body.password,
            name: body.name,
            company_name: body.company_name,
        })
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&ApiResponse::ok(summary)))
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Flat session payload: both tokens plus their remaining lifetimes in
/// milliseconds.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub member_id: MemberId,
    pub access_token: String,
    pub refresh_token: String,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

impl From<SignInResult> for SessionResponse {
    fn from(result: SignInResult) -> Self {
        SessionResponse {
            member_id: result.member_id,
            access_token: result.tokens.access_token,
            refresh_token: result.tokens.refresh_token,
            access_ttl_ms: result.tokens.access_ttl_ms,
            refresh_ttl_ms: result.tokens.refresh_ttl_ms,
        }
    }
}

pub async fn sign_in(
    _principal: Option<PrincipalContext>,
    body: SignInRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .sign_in(SignInInput {
            email: body.email,
            password: body.password,
        })
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&ApiResponse::ok(SessionResponse::from(
        result,
    ))))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

pub async fn logout(
    _principal: Option<PrincipalContext>,
    authorization: Option<String>,
    body: LogoutRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(authorization.as_deref(), &body.refresh_token)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&ApiResponse::<()>::ok(())))
}

#[derive(Debug, Deserialize)]
pub struct ReissueRequest {
    pub refresh_token: String,
}

pub async fn reissue(
    _principal: Option<PrincipalContext>,
    authorization: Option<String>,
    body: ReissueRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .reissue(authorization.as_deref(), &body.refresh_token)
        .await
        .map_err(ApiError::reject)?;

    Ok(warp::reply::json(&ApiResponse::ok(SessionResponse::from(
        result,
    ))))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub member_id: MemberId,
    pub role: MemberRole,
}

pub async fn me(principal: PrincipalContext) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(MeResponse {
        member_id: principal.member_id,
        role: principal.role,
    })))
}
