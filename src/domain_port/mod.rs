mod member_repo;
mod session_store;

pub use member_repo::*;
pub use session_store::*;
