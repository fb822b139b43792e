pub mod api;
pub mod error;
pub mod models;

pub use error::CoreError;
pub use models::{AdminRole, KeyKind, MemberStatus, Tier, User};
