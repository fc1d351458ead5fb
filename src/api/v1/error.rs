use crate::application_port::{AuthError, TokenError};
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Stable machine-readable error codes surfaced to clients. Serialized
/// in SCREAMING_SNAKE_CASE; the wire code never changes even when the
/// message wording does.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    // Gate / filter surface.
    #[error("Authentication token is required")]
    TokenRequired,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Authentication is required")]
    Unauthorized,
    #[error("Access is forbidden for this role")]
    Forbidden,

    // Token parse taxonomy, surfaced by the lifecycle endpoints.
    #[error("Token not found")]
    NotFoundToken,
    #[error("Token structure is malformed")]
    MalformedToken,
    #[error("Token type is not supported")]
    UnsupportedToken,
    #[error("Token signature is invalid")]
    TamperedToken,
    #[error("Token has expired")]
    ExpiredToken,
    #[error("Token is not yet valid")]
    PrematureToken,
    #[error("Token claims are missing or invalid")]
    InvalidClaims,

    // Session lifecycle.
    #[error("No active session for this refresh token")]
    SessionNotFound,
    #[error("Refresh token does not match the current session")]
    SessionMismatch,
    #[error("Access token has been revoked")]
    AccessTokenRevoked,
    #[error("Refresh token has been revoked")]
    RefreshTokenRevoked,

    // Account.
    #[error("Email is already registered")]
    EmailExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Member not found")]
    MemberNotFound,

    #[error("Resource not found")]
    EntityNotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        use ApiErrorCode::*;
        match self {
            TokenRequired | AuthenticationFailed | Unauthorized | NotFoundToken
            | TamperedToken | ExpiredToken | PrematureToken | InvalidClaims => {
                StatusCode::UNAUTHORIZED
            }
            MalformedToken | UnsupportedToken | SessionMismatch | InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Forbidden | AccessTokenRevoked | RefreshTokenRevoked => StatusCode::FORBIDDEN,
            SessionNotFound | MemberNotFound | EntityNotFound => StatusCode::NOT_FOUND,
            EmailExists => StatusCode::CONFLICT,
            InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Missing => ApiErrorCode::NotFoundToken,
            TokenError::Malformed => ApiErrorCode::MalformedToken,
            TokenError::Unsupported => ApiErrorCode::UnsupportedToken,
            TokenError::Tampered => ApiErrorCode::TamperedToken,
            TokenError::Expired => ApiErrorCode::ExpiredToken,
            TokenError::Premature => ApiErrorCode::PrematureToken,
            TokenError::InvalidClaims => ApiErrorCode::InvalidClaims,
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::EmailExists => ApiErrorCode::EmailExists,
            AuthError::MemberNotFound => ApiErrorCode::MemberNotFound,
            AuthError::SessionNotFound => ApiErrorCode::SessionNotFound,
            AuthError::SessionMismatch => ApiErrorCode::SessionMismatch,
            AuthError::AccessTokenRevoked => ApiErrorCode::AccessTokenRevoked,
            AuthError::RefreshTokenRevoked => ApiErrorCode::RefreshTokenRevoked,
            AuthError::Token(e) => e.into(),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::Internal(e) => ApiErrorCode::internal(e),
        }
    }
}

/// Rejection payload: code, human message, and (for gate failures) the
/// request path. Emitted once per failing request by `recover_error`.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub path: Option<String>,
}

impl ApiError {
    pub fn new(code: ApiErrorCode) -> Self {
        ApiError { code, path: None }
    }

    pub fn at_path(code: ApiErrorCode, path: &str) -> Self {
        ApiError {
            code,
            path: Some(path.to_string()),
        }
    }

    pub fn reject(code: impl Into<ApiErrorCode>) -> Rejection {
        reject::custom(ApiError::new(code.into()))
    }
}

impl reject::Reject for ApiError {}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    code: ApiErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, path) = if let Some(api_err) = err.find::<ApiError>() {
        (api_err.code, api_err.path.as_deref())
    } else if err.is_not_found() {
        (ApiErrorCode::EntityNotFound, None)
    } else {
        warn!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, None)
    };

    let body = ErrorResponse {
        code,
        message: code.to_string(),
        path,
    };
    let json = warp::reply::json(&body);
    Ok(warp::reply::with_status(json, code.status()))
}
