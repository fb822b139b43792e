use crate::Database;
use crate::models::{RewardKeyRow, UserRow};
use anyhow::Result;
use rewards_types::{AdminRole, KeyKind};
use rusqlite::Connection;

/// Result of the key-claim transaction. `Claimed` means the claimed flag
/// flipped and the points were credited in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Invalid,
    AlreadyClaimed,
    UserMissing,
    Claimed { points: i64 },
}

impl Database {
    // -- Users --

    /// Idempotent first-contact insert. A second call for the same id is a
    /// no-op and preserves the original join timestamp.
    pub fn create_user_if_absent(&self, user_id: i64, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id, username) VALUES (?1, ?2)",
                (user_id, username),
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, user_id))
    }

    pub fn set_verified(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("UPDATE users SET verified = 1 WHERE user_id = ?1", [user_id])?;
            Ok(n > 0)
        })
    }

    pub fn set_banned(&self, user_id: i64, banned: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET banned = ?1 WHERE user_id = ?2",
                (banned, user_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Single arithmetic UPDATE so concurrent adjustments on the same row
    /// cannot lose writes. Negative balances are allowed.
    pub fn adjust_points(&self, user_id: i64, delta: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET points = points + ?1 WHERE user_id = ?2",
                (delta, user_id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n)
        })
    }

    pub fn list_users(&self, limit: u32, offset: u64) -> Result<Vec<(i64, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username FROM users ORDER BY user_id LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map((limit, offset), |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Admins --

    /// Last write wins; re-inserting an existing id with a new role is the
    /// promotion path.
    pub fn upsert_admin(&self, user_id: i64, role: AdminRole) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO admins (user_id, role) VALUES (?1, ?2)",
                (user_id, role.as_str()),
            )?;
            Ok(())
        })
    }

    pub fn admin_role(&self, user_id: i64) -> Result<Option<AdminRole>> {
        self.with_conn(|conn| {
            let role: Option<String> = conn
                .query_row(
                    "SELECT role FROM admins WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(role.as_deref().and_then(AdminRole::parse))
        })
    }

    pub fn is_admin(&self, user_id: i64) -> Result<bool> {
        Ok(self.admin_role(user_id)?.is_some())
    }

    pub fn is_owner(&self, user_id: i64) -> Result<bool> {
        Ok(self.admin_role(user_id)? == Some(AdminRole::Owner))
    }

    // -- Reward keys --

    pub fn insert_key(&self, token: &str, kind: KeyKind) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reward_keys (token, kind, points_value) VALUES (?1, ?2, ?3)",
                (token, kind.as_str(), kind.points()),
            )?;
            Ok(())
        })
    }

    pub fn get_key(&self, token: &str) -> Result<Option<RewardKeyRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT token, kind, points_value, claimed FROM reward_keys WHERE token = ?1",
                    [token],
                    |row| {
                        Ok(RewardKeyRow {
                            token: row.get(0)?,
                            kind: row.get(1)?,
                            points_value: row.get(2)?,
                            claimed: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn count_unclaimed_keys(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: u64 = conn.query_row(
                "SELECT COUNT(*) FROM reward_keys WHERE claimed = 0",
                [],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    /// Claim a key and credit its value to the user in one transaction.
    /// The conditional UPDATE on the claimed flag is the serialization
    /// point: of two racing claims, exactly one sees a changed row.
    pub fn claim_key(&self, user_id: i64, token: &str) -> Result<ClaimOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let points: Option<i64> = tx
                .query_row(
                    "SELECT points_value FROM reward_keys WHERE token = ?1",
                    [token],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(points) = points else {
                return Ok(ClaimOutcome::Invalid);
            };

            let flipped = tx.execute(
                "UPDATE reward_keys SET claimed = 1 WHERE token = ?1 AND claimed = 0",
                [token],
            )?;
            if flipped == 0 {
                return Ok(ClaimOutcome::AlreadyClaimed);
            }

            let credited = tx.execute(
                "UPDATE users SET points = points + ?1 WHERE user_id = ?2",
                (points, user_id),
            )?;
            if credited == 0 {
                // Dropping the transaction rolls the claimed flag back.
                return Ok(ClaimOutcome::UserMissing);
            }

            tx.commit()?;
            Ok(ClaimOutcome::Claimed { points })
        })
    }

    // -- Referrals --

    /// Append the referral event, credit the referrer and bump their
    /// referral counter in one transaction. Returns false (rolled back)
    /// when the referrer does not exist.
    pub fn record_referral(
        &self,
        referrer_id: i64,
        referred_id: i64,
        points_earned: i64,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO referral_events (referrer_id, referred_id, points_earned)
                 VALUES (?1, ?2, ?3)",
                (referrer_id, referred_id, points_earned),
            )?;

            let updated = tx.execute(
                "UPDATE users SET points = points + ?1, referrals = referrals + 1
                 WHERE user_id = ?2",
                (points_earned, referrer_id),
            )?;
            if updated == 0 {
                return Ok(false);
            }

            tx.commit()?;
            Ok(true)
        })
    }

    // -- Audit logs --

    pub fn append_admin_log(&self, admin_id: i64, action: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO admin_audit_log (admin_id, action) VALUES (?1, ?2)",
                (admin_id, action),
            )?;
            Ok(())
        })
    }

    pub fn append_user_log(&self, user_id: i64, action: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_audit_log (user_id, action) VALUES (?1, ?2)",
                (user_id, action),
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, user_id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, username, role, join_date, points, verified, referrals, banned
         FROM users WHERE user_id = ?1",
    )?;

    let row = stmt
        .query_row([user_id], |row| {
            Ok(UserRow {
                user_id: row.get(0)?,
                username: row.get(1)?,
                role: row.get(2)?,
                join_date: row.get(3)?,
                points: row.get(4)?,
                verified: row.get(5)?,
                referrals: row.get(6)?,
                banned: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn create_user_is_idempotent() {
        let db = db();
        db.create_user_if_absent(1, "alice").unwrap();
        let first = db.get_user(1).unwrap().unwrap();

        db.create_user_if_absent(1, "renamed").unwrap();
        let second = db.get_user(1).unwrap().unwrap();

        assert_eq!(second.username, "alice");
        assert_eq!(second.join_date, first.join_date);
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn new_user_defaults() {
        let db = db();
        db.create_user_if_absent(7, "bob").unwrap();
        let user = db.get_user(7).unwrap().unwrap().into_user();

        assert_eq!(user.role, "user");
        assert_eq!(user.points, 0);
        assert!(!user.verified);
        assert_eq!(user.referrals, 0);
        assert!(!user.banned);
    }

    #[test]
    fn adjust_points_allows_negative_balance() {
        let db = db();
        db.create_user_if_absent(1, "alice").unwrap();

        assert!(db.adjust_points(1, -999_999).unwrap());
        let user = db.get_user(1).unwrap().unwrap();
        assert_eq!(user.points, -999_999);
    }

    #[test]
    fn adjust_points_unknown_user_reports_missing() {
        let db = db();
        assert!(!db.adjust_points(42, 10).unwrap());
    }

    #[test]
    fn upsert_admin_overwrites_role() {
        let db = db();
        db.upsert_admin(5, AdminRole::Admin).unwrap();
        assert!(db.is_admin(5).unwrap());
        assert!(!db.is_owner(5).unwrap());

        db.upsert_admin(5, AdminRole::Owner).unwrap();
        assert!(db.is_owner(5).unwrap());
    }

    #[test]
    fn claim_key_credits_once() {
        let db = db();
        db.create_user_if_absent(1, "alice").unwrap();
        db.insert_key("NKEY-AAAAAAAAAA", KeyKind::Normal).unwrap();

        let first = db.claim_key(1, "NKEY-AAAAAAAAAA").unwrap();
        assert_eq!(first, ClaimOutcome::Claimed { points: 15 });

        let second = db.claim_key(1, "NKEY-AAAAAAAAAA").unwrap();
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);

        assert_eq!(db.get_user(1).unwrap().unwrap().points, 15);
    }

    #[test]
    fn claim_key_unknown_token_is_invalid() {
        let db = db();
        db.create_user_if_absent(1, "alice").unwrap();
        assert_eq!(db.claim_key(1, "NKEY-MISSING000").unwrap(), ClaimOutcome::Invalid);
    }

    #[test]
    fn claim_key_unknown_user_rolls_back_flag() {
        let db = db();
        db.insert_key("PKEY-BBBBBBBBBB", KeyKind::Premium).unwrap();

        let outcome = db.claim_key(99, "PKEY-BBBBBBBBBB").unwrap();
        assert_eq!(outcome, ClaimOutcome::UserMissing);

        // The key must still be claimable.
        assert!(!db.get_key("PKEY-BBBBBBBBBB").unwrap().unwrap().claimed);
    }

    #[test]
    fn concurrent_claims_credit_exactly_once() {
        let db = Arc::new(db());
        db.create_user_if_absent(1, "alice").unwrap();
        db.insert_key("NKEY-RACE000000", KeyKind::Normal).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.claim_key(1, "NKEY-RACE000000").unwrap())
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = outcomes
            .iter()
            .filter(|o| matches!(o, ClaimOutcome::Claimed { .. }))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(db.get_user(1).unwrap().unwrap().points, 15);
    }

    #[test]
    fn record_referral_updates_counter_and_points() {
        let db = db();
        db.create_user_if_absent(1, "alice").unwrap();

        assert!(db.record_referral(1, 2, 10).unwrap());
        let user = db.get_user(1).unwrap().unwrap();
        assert_eq!(user.points, 10);
        assert_eq!(user.referrals, 1);
    }

    #[test]
    fn record_referral_unknown_referrer_rolls_back() {
        let db = db();
        assert!(!db.record_referral(404, 2, 10).unwrap());
    }
}
