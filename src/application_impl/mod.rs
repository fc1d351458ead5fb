mod auth_service_impl;
mod credential_hasher_argon2;
mod member_repo_fake;
mod session_store_fake;
mod token_codec_jwt;

pub use auth_service_impl::*;
pub use credential_hasher_argon2::*;
pub use member_repo_fake::*;
pub use session_store_fake::*;
pub use token_codec_jwt::*;
