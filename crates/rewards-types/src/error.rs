use thiserror::Error;

/// Core operation outcomes a caller must be able to tell apart: business-rule
/// rejections carry their own variants, while store faults surface as
/// `Store` so "your request was denied" is never confused with "the system
/// failed".
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,

    #[error("invalid key")]
    InvalidKey,

    #[error("key already claimed")]
    AlreadyClaimed,

    #[error("not authorized")]
    NotAuthorized,

    #[error("self-referral is not allowed")]
    SelfReferral,

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("store failure")]
    Store(#[source] anyhow::Error),
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Store(err)
    }
}
