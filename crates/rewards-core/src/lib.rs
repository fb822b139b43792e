pub mod gate;
pub mod moderation;
pub mod redeem;
pub mod referral;
pub mod service;
pub mod tiers;
pub mod traits;

pub use gate::{FirstContact, VerificationOutcome};
pub use redeem::GenerateError;
pub use service::RewardsService;
pub use traits::{MembershipOracle, MessagingSink};
