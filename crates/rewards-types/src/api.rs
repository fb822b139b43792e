use serde::{Deserialize, Serialize};

use crate::models::{KeyKind, Tier};

// -- First contact / verification --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartRequest {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub verified: bool,
    pub tier: Tier,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    /// Channels the user still has to join. Empty when verified.
    pub outstanding: Vec<String>,
}

// -- Key redemption --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimRequest {
    pub user_id: i64,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub points_credited: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateKeysRequest {
    pub actor_id: i64,
    pub kind: KeyKind,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct GenerateKeysResponse {
    pub tokens: Vec<String>,
}

// -- Moderation --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerationRequest {
    pub actor_id: i64,
    pub target_id: i64,
}

// -- Referrals --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferralRequest {
    pub referrer_id: i64,
    pub referred_id: i64,
    pub points: i64,
}

// -- Account surface --

#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub user_id: i64,
    pub username: String,
    pub tier: Tier,
    pub points: i64,
    pub verified: bool,
    pub referrals: i64,
    pub banned: bool,
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub page: u32,
    pub total: u64,
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
}
