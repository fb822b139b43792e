use rewards_types::{AdminRole, CoreError, Tier};

use crate::service::RewardsService;

impl RewardsService {
    /// Derive a user's privilege tier from the admins table. `users.role`
    /// is never consulted.
    pub fn tier_of(&self, user_id: i64) -> Result<Tier, CoreError> {
        let tier = match self.db.admin_role(user_id).map_err(CoreError::Store)? {
            Some(AdminRole::Owner) => Tier::Owner,
            Some(AdminRole::Admin) => Tier::Admin,
            None => Tier::User,
        };
        Ok(tier)
    }

    /// Tier gate for privileged operations. Checked before any mutation;
    /// the rejection carries no detail about the caller's actual tier.
    pub(crate) fn require_tier(&self, user_id: i64, min: Tier) -> Result<(), CoreError> {
        if self.tier_of(user_id)? >= min {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized)
        }
    }
}
