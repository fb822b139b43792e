use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use rewards_core::{GenerateError, RewardsService, VerificationOutcome};
use rewards_types::CoreError;
use rewards_types::api::{
    AccountInfo, ClaimRequest, ClaimResponse, GenerateKeysRequest, GenerateKeysResponse,
    ModerationRequest, ReferralRequest, StartRequest, StartResponse, UserPage, UserSummary,
    VerifyRequest, VerifyResponse,
};

pub type SharedService = Arc<RewardsService>;

/// Transport-level error: a status code plus a reason the caller sees in
/// the same response turn. Business rejections map to 4xx, store faults to
/// 500 with the detail kept in the server log.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::NotFound | CoreError::InvalidKey => StatusCode::NOT_FOUND,
            CoreError::AlreadyClaimed => StatusCode::CONFLICT,
            CoreError::NotAuthorized => StatusCode::FORBIDDEN,
            CoreError::SelfReferral | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Store(e) => {
                error!("Store failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", e);
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "internal error".to_string(),
    }
}

pub async fn start(
    State(svc): State<SharedService>,
    Json(req): Json<StartRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let contact = tokio::task::spawn_blocking(move || svc.first_contact(req.user_id, &req.username))
        .await
        .map_err(join_error)??;

    Ok(Json(StartResponse {
        verified: contact.verified,
        tier: contact.tier,
    }))
}

pub async fn verify(
    State(svc): State<SharedService>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = svc.verify(req.user_id).await?;
    let resp = match outcome {
        VerificationOutcome::Verified => VerifyResponse {
            verified: true,
            outstanding: vec![],
        },
        VerificationOutcome::Outstanding(channels) => VerifyResponse {
            verified: false,
            outstanding: channels,
        },
    };
    Ok(Json(resp))
}

pub async fn claim(
    State(svc): State<SharedService>,
    Json(req): Json<ClaimRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let points = tokio::task::spawn_blocking(move || svc.claim_key(req.user_id, &req.key))
        .await
        .map_err(join_error)??;

    Ok(Json(ClaimResponse {
        points_credited: points,
    }))
}

pub async fn generate_keys(
    State(svc): State<SharedService>,
    Json(req): Json<GenerateKeysRequest>,
) -> Result<Response, ApiError> {
    let result =
        tokio::task::spawn_blocking(move || svc.generate_keys(req.actor_id, req.kind, req.quantity))
            .await
            .map_err(join_error)?;

    match result {
        Ok(tokens) => Ok(Json(GenerateKeysResponse { tokens }).into_response()),
        Err(GenerateError::NotAuthorized) => Err(ApiError {
            status: StatusCode::FORBIDDEN,
            message: "not authorized".to_string(),
        }),
        // Partial success must reach the operator: the created tokens are
        // returned alongside the error.
        Err(GenerateError::Partial { created, source }) => {
            error!("Key generation failed mid-batch: {:#}", source);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "store failure mid-batch", "created": created })),
            )
                .into_response())
        }
        Err(GenerateError::Store(e)) => {
            error!("Key generation failed: {:#}", e);
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "store failure".to_string(),
            })
        }
    }
}

pub async fn ban(
    State(svc): State<SharedService>,
    Json(req): Json<ModerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || svc.ban(req.actor_id, req.target_id))
        .await
        .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unban(
    State(svc): State<SharedService>,
    Json(req): Json<ModerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || svc.unban(req.actor_id, req.target_id))
        .await
        .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_owner(
    State(svc): State<SharedService>,
    Json(req): Json<ModerationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || svc.add_owner(req.actor_id, req.target_id))
        .await
        .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn referral(
    State(svc): State<SharedService>,
    Json(req): Json<ReferralRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tokio::task::spawn_blocking(move || {
        svc.record_referral(req.referrer_id, req.referred_id, req.points)
    })
    .await
    .map_err(join_error)??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn account_info(
    State(svc): State<SharedService>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, tier) = tokio::task::spawn_blocking(move || svc.account_info(user_id))
        .await
        .map_err(join_error)??;

    Ok(Json(AccountInfo {
        user_id: user.id,
        username: user.username,
        tier,
        points: user.points,
        verified: user.verified,
        referrals: user.referrals,
        banned: user.banned,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

pub async fn list_users(
    State(svc): State<SharedService>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let (total, users) = tokio::task::spawn_blocking(move || svc.user_page(page))
        .await
        .map_err(join_error)??;

    Ok(Json(UserPage {
        page,
        total,
        users: users
            .into_iter()
            .map(|(user_id, username)| UserSummary { user_id, username })
            .collect(),
    }))
}
