use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'user',
            join_date   TEXT NOT NULL DEFAULT (datetime('now')),
            points      INTEGER NOT NULL DEFAULT 0,
            verified    INTEGER NOT NULL DEFAULT 0,
            referrals   INTEGER NOT NULL DEFAULT 0,
            banned      INTEGER NOT NULL DEFAULT 0
        );

        -- Authoritative privilege table. users.role is informational only.
        CREATE TABLE IF NOT EXISTS admins (
            user_id     INTEGER PRIMARY KEY,
            role        TEXT NOT NULL CHECK (role IN ('admin', 'owner'))
        );

        CREATE TABLE IF NOT EXISTS reward_keys (
            token        TEXT PRIMARY KEY,
            kind         TEXT NOT NULL,
            points_value INTEGER NOT NULL,
            claimed      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS referral_events (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            referrer_id   INTEGER NOT NULL,
            referred_id   INTEGER NOT NULL,
            points_earned INTEGER NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS admin_audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            admin_id    INTEGER NOT NULL,
            action      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS user_audit_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            action      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_referral_events_referrer
            ON referral_events(referrer_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
