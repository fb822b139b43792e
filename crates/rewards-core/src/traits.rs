use anyhow::Result;
use async_trait::async_trait;
use rewards_types::MemberStatus;

/// External channel-membership check. Any error from an implementation is
/// treated by the verification gate as "not a member" for that channel.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    async fn status(&self, channel: &str, user_id: i64) -> Result<MemberStatus>;
}

/// Fire-and-forget outbound messaging. Targets are either a numeric user id
/// or a channel handle, rendered as a string either way. Send failures are
/// logged by callers and never propagated as core errors.
#[async_trait]
pub trait MessagingSink: Send + Sync {
    async fn notify(&self, target: &str, text: &str) -> Result<()>;
}

/// Sink that drops every message. Useful for tests and headless runs.
pub struct NullSink;

#[async_trait]
impl MessagingSink for NullSink {
    async fn notify(&self, _target: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}
