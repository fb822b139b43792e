use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use rewards_core::{MessagingSink, RewardsService};

/// Periodic stock notification. Each tick runs one ledger query and sends
/// one message to the configured channel; failures are logged and the loop
/// keeps running.
pub async fn run_notify_loop(
    svc: Arc<RewardsService>,
    sink: Arc<dyn MessagingSink>,
    channel: String,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let unclaimed = match svc.unclaimed_key_count() {
            Ok(n) => n,
            Err(e) => {
                warn!("Notification ledger query failed: {}", e);
                continue;
            }
        };

        let text = format!("{} reward keys are still up for grabs.", unclaimed);
        if let Err(e) = sink.notify(&channel, &text).await {
            warn!("Scheduled notification to {} failed: {}", channel, e);
        } else {
            info!("Scheduled notification sent to {}", channel);
        }
    }
}
