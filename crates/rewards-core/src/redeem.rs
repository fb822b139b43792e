use rand::Rng;
use rewards_db::ClaimOutcome;
use rewards_types::{CoreError, KeyKind, Tier};
use thiserror::Error;
use tracing::info;

use crate::service::RewardsService;

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TOKEN_SUFFIX_LEN: usize = 10;

/// Key generation failure. `Partial` carries the tokens that were created
/// before the fault so a mid-batch store failure is reported, not swallowed.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("not authorized")]
    NotAuthorized,

    #[error("store failure after {} keys created", created.len())]
    Partial {
        created: Vec<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("store failure")]
    Store(#[source] anyhow::Error),
}

impl RewardsService {
    /// Redeem a reward key for its fixed point value. The claimed-flag
    /// transition and the point credit are one store transaction; of two
    /// racing claims exactly one succeeds.
    pub fn claim_key(&self, user_id: i64, token: &str) -> Result<i64, CoreError> {
        // Exact-match lookup; only surrounding whitespace is stripped.
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::Validation("empty key".to_string()));
        }

        match self.db.claim_key(user_id, token).map_err(CoreError::Store)? {
            ClaimOutcome::Invalid => Err(CoreError::InvalidKey),
            ClaimOutcome::AlreadyClaimed => Err(CoreError::AlreadyClaimed),
            ClaimOutcome::UserMissing => Err(CoreError::NotFound),
            ClaimOutcome::Claimed { points } => {
                self.log_user_action(user_id, &format!("Claimed key {} for {} points", token, points));
                info!("User {} claimed key {} for {} points", user_id, token, points);
                Ok(points)
            }
        }
    }

    /// Generate a batch of reward keys. Owner tier only. Each key is an
    /// independent store write; the returned list is the only record an
    /// operator has of the unclaimed key values.
    pub fn generate_keys(
        &self,
        actor_id: i64,
        kind: KeyKind,
        quantity: u32,
    ) -> Result<Vec<String>, GenerateError> {
        match self.require_tier(actor_id, Tier::Owner) {
            Ok(()) => {}
            Err(CoreError::NotAuthorized) => return Err(GenerateError::NotAuthorized),
            Err(CoreError::Store(e)) => return Err(GenerateError::Store(e)),
            Err(e) => return Err(GenerateError::Store(anyhow::Error::new(e))),
        }

        let mut created = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let token = random_token(kind);
            if let Err(e) = self.db.insert_key(&token, kind) {
                return Err(GenerateError::Partial { created, source: e });
            }
            created.push(token);
        }

        self.log_admin_action(
            actor_id,
            &format!("Generated {} {} keys", created.len(), kind.as_str()),
        );
        info!("{} generated {} {} keys", actor_id, created.len(), kind.as_str());
        Ok(created)
    }
}

/// Prefix plus 10 characters over a 36-symbol alphabet: collision odds are
/// negligible at any realistic issuance volume.
fn random_token(kind: KeyKind) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..TOKEN_SUFFIX_LEN)
        .map(|_| TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", kind.prefix(), suffix)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;

    use rewards_types::{AdminRole, CoreError, KeyKind};

    use super::GenerateError;
    use crate::service::testutil::service;

    #[test]
    fn normal_keys_match_format_and_value() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(1, AdminRole::Owner).unwrap();

        let tokens = svc.generate_keys(1, KeyKind::Normal, 5).unwrap();
        for token in &tokens {
            assert!(token.starts_with("NKEY-"));
            let suffix = &token["NKEY-".len()..];
            assert_eq!(suffix.len(), 10);
            assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));

            let key = svc.db().get_key(token).unwrap().unwrap();
            assert_eq!(key.points_value, 15);
            assert!(!key.claimed);
        }
    }

    #[test]
    fn premium_keys_match_format_and_value() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(1, AdminRole::Owner).unwrap();

        let tokens = svc.generate_keys(1, KeyKind::Premium, 3).unwrap();
        for token in &tokens {
            assert!(token.starts_with("PKEY-"));
            assert_eq!(svc.db().get_key(token).unwrap().unwrap().points_value, 35);
        }
    }

    #[test]
    fn batch_of_100_is_distinct() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(1, AdminRole::Owner).unwrap();

        let tokens = svc.generate_keys(1, KeyKind::Normal, 100).unwrap();
        let distinct: HashSet<_> = tokens.iter().collect();
        assert_eq!(distinct.len(), 100);
    }

    #[test]
    fn admin_cannot_generate_keys() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(2, AdminRole::Admin).unwrap();

        let err = svc.generate_keys(2, KeyKind::Normal, 1).unwrap_err();
        assert!(matches!(err, GenerateError::NotAuthorized));
    }

    #[test]
    fn claim_trims_surrounding_whitespace() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(1, AdminRole::Owner).unwrap();
        svc.first_contact(2, "alice").unwrap();

        let tokens = svc.generate_keys(1, KeyKind::Normal, 1).unwrap();
        let padded = format!("  {}  ", tokens[0]);

        assert_eq!(svc.claim_key(2, &padded).unwrap(), 15);
        let (user, _) = svc.account_info(2).unwrap();
        assert_eq!(user.points, 15);
    }

    #[test]
    fn double_claim_is_rejected_without_second_credit() {
        let svc = service(HashMap::new(), &[]);
        svc.db().upsert_admin(1, AdminRole::Owner).unwrap();
        svc.first_contact(2, "alice").unwrap();

        let tokens = svc.generate_keys(1, KeyKind::Premium, 1).unwrap();
        assert_eq!(svc.claim_key(2, &tokens[0]).unwrap(), 35);

        let err = svc.claim_key(2, &tokens[0]).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyClaimed));
        assert_eq!(svc.account_info(2).unwrap().0.points, 35);
    }

    #[test]
    fn unknown_key_is_invalid() {
        let svc = service(HashMap::new(), &[]);
        svc.first_contact(2, "alice").unwrap();

        let err = svc.claim_key(2, "NKEY-DOESNOTEXI").unwrap_err();
        assert!(matches!(err, CoreError::InvalidKey));
    }
}
