use crate::domain_model::{MemberId, MemberRole};
use serde::Serialize;

/// Authenticated subject of a single request. Constructed once by the
/// request gate after token validation and passed explicitly down the
/// call chain; never persisted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct PrincipalContext {
    pub member_id: MemberId,
    pub role: MemberRole,
}

impl PrincipalContext {
    pub fn new(member_id: MemberId, role: MemberRole) -> Self {
        PrincipalContext { member_id, role }
    }
}
