use rewards_types::{AdminRole, CoreError, Tier};
use tracing::info;

use crate::service::RewardsService;

impl RewardsService {
    /// Ban a user. Admin tier required; the tier check runs before any
    /// mutation.
    pub fn ban(&self, actor_id: i64, target_id: i64) -> Result<(), CoreError> {
        self.require_tier(actor_id, Tier::Admin)?;
        self.set_banned(actor_id, target_id, true)
    }

    /// Unban a user. Orthogonal to verification: unbanning does not touch
    /// the verified flag.
    pub fn unban(&self, actor_id: i64, target_id: i64) -> Result<(), CoreError> {
        self.require_tier(actor_id, Tier::Admin)?;
        self.set_banned(actor_id, target_id, false)
    }

    fn set_banned(&self, actor_id: i64, target_id: i64, banned: bool) -> Result<(), CoreError> {
        let found = self
            .db
            .set_banned(target_id, banned)
            .map_err(CoreError::Store)?;
        if !found {
            return Err(CoreError::NotFound);
        }

        let action = if banned { "Banned" } else { "Unbanned" };
        self.log_admin_action(actor_id, &format!("{} user {}", action, target_id));
        info!("{} user {} (by {})", action, target_id, actor_id);
        Ok(())
    }

    /// Promote a user to owner. Owner tier required; admins are rejected.
    /// Promotion is an upsert, so re-promoting is harmless and promoting an
    /// existing admin overwrites their role.
    pub fn add_owner(&self, actor_id: i64, target_id: i64) -> Result<(), CoreError> {
        self.require_tier(actor_id, Tier::Owner)?;
        self.db
            .upsert_admin(target_id, AdminRole::Owner)
            .map_err(CoreError::Store)?;
        self.log_admin_action(actor_id, &format!("Added owner {}", target_id));
        info!("User {} promoted to owner by {}", target_id, actor_id);
        Ok(())
    }
}
