use rewards_types::{CoreError, Tier};
use tracing::{debug, info, warn};

use crate::service::RewardsService;

/// Outcome of a first contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstContact {
    pub verified: bool,
    pub tier: Tier,
}

/// Outcome of a verification attempt. `Outstanding` lists exactly the
/// channels the user still has to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Outstanding(Vec<String>),
}

impl RewardsService {
    /// First contact: idempotent account creation. Admins and owners are
    /// auto-verified here without any oracle call; everyone else starts
    /// unverified and goes through [`RewardsService::verify`].
    pub fn first_contact(&self, user_id: i64, username: &str) -> Result<FirstContact, CoreError> {
        self.db
            .create_user_if_absent(user_id, username)
            .map_err(CoreError::Store)?;

        let tier = self.tier_of(user_id)?;
        if tier >= Tier::Admin {
            self.db.set_verified(user_id).map_err(CoreError::Store)?;
            info!("Auto-verified {} on first contact (tier {:?})", user_id, tier);
            return Ok(FirstContact {
                verified: true,
                tier,
            });
        }

        let verified = self
            .db
            .get_user(user_id)
            .map_err(CoreError::Store)?
            .ok_or(CoreError::NotFound)?
            .verified;
        Ok(FirstContact { verified, tier })
    }

    /// Run a verification attempt. All channel statuses are collected first
    /// (no store lock is held across oracle calls), then the transition is
    /// applied as a single local write. Every attempt re-queries all
    /// channels fresh; nothing is cached across retries.
    pub async fn verify(&self, user_id: i64) -> Result<VerificationOutcome, CoreError> {
        let user = self
            .db
            .get_user(user_id)
            .map_err(CoreError::Store)?
            .ok_or(CoreError::NotFound)?;

        // Admins and owners bypass the channel check entirely.
        if self.tier_of(user_id)? >= Tier::Admin {
            self.db.set_verified(user_id).map_err(CoreError::Store)?;
            return Ok(VerificationOutcome::Verified);
        }

        // Verified is terminal; no need to re-consult the oracle.
        if user.verified {
            return Ok(VerificationOutcome::Verified);
        }

        let mut outstanding = Vec::new();
        for channel in &self.required_channels {
            let satisfied =
                match tokio::time::timeout(self.oracle_timeout, self.oracle.status(channel, user_id))
                    .await
                {
                    Ok(Ok(status)) => {
                        debug!("Channel {} status for {}: {:?}", channel, user_id, status);
                        status.satisfies_verification()
                    }
                    Ok(Err(e)) => {
                        // Fail closed: an oracle error never counts as membership.
                        warn!("Oracle error for channel {}: {}", channel, e);
                        false
                    }
                    Err(_) => {
                        warn!("Oracle timed out for channel {}", channel);
                        false
                    }
                };
            if !satisfied {
                outstanding.push(channel.clone());
            }
        }

        if !outstanding.is_empty() {
            return Ok(VerificationOutcome::Outstanding(outstanding));
        }

        self.db.set_verified(user_id).map_err(CoreError::Store)?;
        self.log_user_action(user_id, "Verified");
        info!("User {} verified", user_id);
        self.notify(
            &user_id.to_string(),
            "You are verified! Welcome to the main menu.",
        )
        .await;

        Ok(VerificationOutcome::Verified)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rewards_types::{AdminRole, MemberStatus, Tier};

    use super::VerificationOutcome;
    use crate::service::testutil::{
        RecordingSink, StubOracle, service, service_with_oracle, service_with_sink,
    };

    const CHANNELS: [&str; 3] = ["@alpha", "@beta", "@gamma"];

    fn all_member() -> HashMap<String, MemberStatus> {
        CHANNELS
            .iter()
            .map(|c| (c.to_string(), MemberStatus::Member))
            .collect()
    }

    #[tokio::test]
    async fn all_channels_satisfied_verifies() {
        let svc = service(all_member(), &CHANNELS);
        svc.first_contact(1, "alice").unwrap();

        let outcome = svc.verify(1).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::Verified);
        assert!(svc.db().get_user(1).unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn missing_membership_lists_outstanding_channels() {
        let mut statuses = all_member();
        statuses.insert("@beta".to_string(), MemberStatus::Left);
        let svc = service(statuses, &CHANNELS);
        svc.first_contact(1, "alice").unwrap();

        let outcome = svc.verify(1).await.unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::Outstanding(vec!["@beta".to_string()])
        );
        assert!(!svc.db().get_user(1).unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn oracle_error_fails_closed() {
        // "@gamma" is absent from the stub map, so the oracle errors for it
        // while the other channels pass.
        let mut statuses = all_member();
        statuses.remove("@gamma");
        let svc = service(statuses, &CHANNELS);
        svc.first_contact(1, "alice").unwrap();

        let outcome = svc.verify(1).await.unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::Outstanding(vec!["@gamma".to_string()])
        );
    }

    #[tokio::test]
    async fn retry_requeries_all_channels() {
        let mut statuses = all_member();
        statuses.insert("@beta".to_string(), MemberStatus::Restricted);
        let oracle = Arc::new(StubOracle::new(statuses));
        let svc = service_with_oracle(oracle.clone(), &CHANNELS);
        svc.first_contact(1, "alice").unwrap();

        svc.verify(1).await.unwrap();
        svc.verify(1).await.unwrap();

        // No partial-success caching: each failed attempt hits every channel.
        assert_eq!(oracle.call_count(), 2 * CHANNELS.len());
    }

    #[tokio::test]
    async fn admin_auto_verified_without_oracle_calls() {
        let oracle = Arc::new(StubOracle::new(HashMap::new()));
        let svc = service_with_oracle(oracle.clone(), &CHANNELS);
        svc.db().upsert_admin(9, AdminRole::Admin).unwrap();

        let contact = svc.first_contact(9, "mod").unwrap();
        assert!(contact.verified);
        assert_eq!(contact.tier, Tier::Admin);
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn success_notification_sent_exactly_once() {
        let sink = Arc::new(RecordingSink::new());
        let svc = service_with_sink(all_member(), &CHANNELS, sink.clone());
        svc.first_contact(1, "alice").unwrap();

        svc.verify(1).await.unwrap();
        svc.verify(1).await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "1");
    }

    #[tokio::test]
    async fn verified_user_stays_verified() {
        let svc = service(all_member(), &CHANNELS);
        svc.first_contact(1, "alice").unwrap();
        svc.verify(1).await.unwrap();

        // Second attempt short-circuits; verified is terminal.
        assert_eq!(svc.verify(1).await.unwrap(), VerificationOutcome::Verified);
    }
}
