use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use rewards_core::{MembershipOracle, MessagingSink};
use rewards_types::MemberStatus;

/// Chat-platform HTTP API client backing both collaborators. The oracle
/// call maps onto `getChatMember`, the sink onto `sendMessage`.
#[derive(Clone)]
pub struct ChatApi {
    client: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatMemberResponse {
    result: ChatMember,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: MemberStatus,
}

#[async_trait]
impl MembershipOracle for ChatApi {
    async fn status(&self, channel: &str, user_id: i64) -> Result<MemberStatus> {
        let uid = user_id.to_string();
        let resp = self
            .client
            .get(format!("{}/getChatMember", self.base_url))
            .query(&[("chat_id", channel), ("user_id", uid.as_str())])
            .send()
            .await
            .context("oracle request failed")?
            .error_for_status()
            .context("oracle returned an error status")?;

        let body: ChatMemberResponse = resp.json().await.context("malformed oracle response")?;
        Ok(body.result.status)
    }
}

#[async_trait]
impl MessagingSink for ChatApi {
    async fn notify(&self, target: &str, text: &str) -> Result<()> {
        self.client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&json!({ "chat_id": target, "text": text }))
            .send()
            .await
            .context("sendMessage request failed")?
            .error_for_status()
            .context("sendMessage returned an error status")?;
        Ok(())
    }
}
