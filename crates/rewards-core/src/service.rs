use std::sync::Arc;
use std::time::Duration;

use rewards_db::Database;
use rewards_types::{CoreError, Tier, User};
use tracing::warn;

use crate::traits::{MembershipOracle, MessagingSink};

/// Number of users per admin-listing page.
pub const USERS_PER_PAGE: u32 = 10;

/// The verification & reward ledger core. Holds the shared store handle and
/// the two external collaborators; all operations go through here.
pub struct RewardsService {
    pub(crate) db: Arc<Database>,
    pub(crate) oracle: Arc<dyn MembershipOracle>,
    pub(crate) sink: Arc<dyn MessagingSink>,
    pub(crate) required_channels: Vec<String>,
    pub(crate) oracle_timeout: Duration,
}

impl RewardsService {
    pub fn new(
        db: Arc<Database>,
        oracle: Arc<dyn MembershipOracle>,
        sink: Arc<dyn MessagingSink>,
        required_channels: Vec<String>,
        oracle_timeout: Duration,
    ) -> Self {
        Self {
            db,
            oracle,
            sink,
            required_channels,
            oracle_timeout,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Read-only account snapshot plus derived tier.
    pub fn account_info(&self, user_id: i64) -> Result<(User, Tier), CoreError> {
        let row = self
            .db
            .get_user(user_id)
            .map_err(CoreError::Store)?
            .ok_or(CoreError::NotFound)?;
        let tier = self.tier_of(user_id)?;
        Ok((row.into_user(), tier))
    }

    /// One page of the admin user listing: total count plus (id, username)
    /// pairs. Pages are 1-based. The offset is widened to u64 so a huge
    /// page number cannot overflow.
    pub fn user_page(&self, page: u32) -> Result<(u64, Vec<(i64, String)>), CoreError> {
        let page = page.max(1);
        let offset = u64::from(page - 1) * u64::from(USERS_PER_PAGE);
        let total = self.db.count_users().map_err(CoreError::Store)?;
        let users = self
            .db
            .list_users(USERS_PER_PAGE, offset)
            .map_err(CoreError::Store)?;
        Ok((total, users))
    }

    /// The single ledger query the periodic notification task runs.
    pub fn unclaimed_key_count(&self) -> Result<u64, CoreError> {
        self.db.count_unclaimed_keys().map_err(CoreError::Store)
    }

    /// Audit-log writes are best-effort: a failure is logged and never
    /// aborts the triggering operation.
    pub(crate) fn log_user_action(&self, user_id: i64, action: &str) {
        if let Err(e) = self.db.append_user_log(user_id, action) {
            warn!("User audit log write failed for {}: {}", user_id, e);
        }
    }

    pub(crate) fn log_admin_action(&self, admin_id: i64, action: &str) {
        if let Err(e) = self.db.append_admin_log(admin_id, action) {
            warn!("Admin audit log write failed for {}: {}", admin_id, e);
        }
    }

    pub(crate) async fn notify(&self, target: &str, text: &str) {
        if let Err(e) = self.sink.notify(target, text).await {
            warn!("Notification to {} failed: {}", target, e);
        }
    }
}


#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use rewards_db::Database;
    use rewards_types::MemberStatus;

    use super::RewardsService;
    use crate::traits::{MembershipOracle, MessagingSink, NullSink};

    /// Oracle backed by a fixed status map. Channels absent from the map
    /// produce an error, covering the fail-closed path. Counts calls so
    /// tests can assert the auto-verify bypass never consults it.
    pub struct StubOracle {
        pub statuses: HashMap<String, MemberStatus>,
        pub calls: AtomicUsize,
    }

    impl StubOracle {
        pub fn new(statuses: HashMap<String, MemberStatus>) -> Self {
            Self {
                statuses,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MembershipOracle for StubOracle {
        async fn status(&self, channel: &str, _user_id: i64) -> Result<MemberStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .get(channel)
                .copied()
                .ok_or_else(|| anyhow!("oracle unavailable for {}", channel))
        }
    }

    pub fn service_with_oracle(
        oracle: Arc<dyn MembershipOracle>,
        channels: &[&str],
    ) -> RewardsService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        RewardsService::new(
            db,
            oracle,
            Arc::new(NullSink),
            channels.iter().map(|c| c.to_string()).collect(),
            Duration::from_millis(200),
        )
    }

    pub fn service(statuses: HashMap<String, MemberStatus>, channels: &[&str]) -> RewardsService {
        service_with_oracle(Arc::new(StubOracle::new(statuses)), channels)
    }

    pub fn service_with_sink(
        statuses: HashMap<String, MemberStatus>,
        channels: &[&str],
        sink: Arc<dyn MessagingSink>,
    ) -> RewardsService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        RewardsService::new(
            db,
            Arc::new(StubOracle::new(statuses)),
            sink,
            channels.iter().map(|c| c.to_string()).collect(),
            Duration::from_millis(200),
        )
    }

    /// Sink recording every message, for asserting notification behavior.
    pub struct RecordingSink {
        pub sent: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessagingSink for RecordingSink {
        async fn notify(&self, target: &str, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), text.to_string()));
            Ok(())
        }
    }
}
