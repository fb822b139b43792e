//! Database row types — these map directly to SQLite rows.
//! Distinct from the rewards-types API models to keep the DB layer
//! independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use rewards_types::User;

pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub join_date: String,
    pub points: i64,
    pub verified: bool,
    pub referrals: i64,
    pub banned: bool,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.user_id,
            username: self.username,
            role: self.role,
            joined_at: parse_sqlite_timestamp(&self.join_date),
            points: self.points,
            verified: self.verified,
            referrals: self.referrals,
            banned: self.banned,
        }
    }
}

pub struct RewardKeyRow {
    pub token: String,
    pub kind: String,
    pub points_value: i64,
    pub claimed: bool,
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; fall back to RFC 3339 for values written
/// by other tooling.
pub fn parse_sqlite_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .or_else(|_| raw.parse::<DateTime<Utc>>())
        .unwrap_or_else(|_| {
            tracing::warn!("Corrupt timestamp '{}', defaulting to epoch", raw);
            DateTime::default()
        })
}
