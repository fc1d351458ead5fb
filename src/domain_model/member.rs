use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct MemberId(pub i64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemberId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(MemberId)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    User,
    Admin,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::User => "USER",
            MemberRole::Admin => "ADMIN",
        }
    }

    /// Parse a role string from a token claim or header value.
    /// Case-insensitive; a `ROLE_` prefix is tolerated and stripped.
    pub fn parse(raw: &str) -> Option<MemberRole> {
        let t = raw.trim();
        if t.is_empty() {
            return None;
        }
        let t = t.to_ascii_uppercase();
        let t = t.strip_prefix("ROLE_").unwrap_or(&t);
        match t {
            "USER" => Some(MemberRole::User),
            "ADMIN" => Some(MemberRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
