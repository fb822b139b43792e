use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's privilege level. Owner strictly dominates admin; admin strictly
/// dominates user. Derived from the admins table, never from `User::role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    User,
    Admin,
    Owner,
}

/// Role stored in the admins table. A plain user has no record there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    Owner,
}

impl AdminRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Admin => "admin",
            AdminRole::Owner => "owner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(AdminRole::Admin),
            "owner" => Some(AdminRole::Owner),
            _ => None,
        }
    }
}

/// Reward key kind. Each kind carries a fixed point value and token prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Normal,
    Premium,
}

impl KeyKind {
    pub fn points(self) -> i64 {
        match self {
            KeyKind::Normal => 15,
            KeyKind::Premium => 35,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            KeyKind::Normal => "NKEY-",
            KeyKind::Premium => "PKEY-",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Normal => "normal",
            KeyKind::Premium => "premium",
        }
    }
}

/// Membership status reported by the external oracle for one channel.
/// Only `Member`, `Administrator` and `Creator` satisfy verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Member,
    Administrator,
    Creator,
    Left,
    Kicked,
    Restricted,
    #[serde(other)]
    Other,
}

impl MemberStatus {
    pub fn satisfies_verification(self) -> bool {
        matches!(
            self,
            MemberStatus::Member | MemberStatus::Administrator | MemberStatus::Creator
        )
    }
}

/// A user account. `role` mirrors the original schema and is informational
/// only; privilege checks go through the admins table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub points: i64,
    pub verified: bool,
    pub referrals: i64,
    pub banned: bool,
}
