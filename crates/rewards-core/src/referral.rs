use rewards_types::CoreError;
use tracing::info;

use crate::service::RewardsService;

impl RewardsService {
    /// Record a referral: append the event, credit the referrer and bump
    /// their referral counter. The trigger (invite-link parsing and the
    /// like) is the transport's concern; this only guarantees the
    /// bookkeeping once invoked.
    pub fn record_referral(
        &self,
        referrer_id: i64,
        referred_id: i64,
        points: i64,
    ) -> Result<(), CoreError> {
        if referrer_id == referred_id {
            return Err(CoreError::SelfReferral);
        }

        let applied = self
            .db
            .record_referral(referrer_id, referred_id, points)
            .map_err(CoreError::Store)?;
        if !applied {
            return Err(CoreError::NotFound);
        }

        self.log_user_action(
            referrer_id,
            &format!("Referral of {} earned {} points", referred_id, points),
        );
        info!(
            "Referral: {} referred {} for {} points",
            referrer_id, referred_id, points
        );
        Ok(())
    }
}
