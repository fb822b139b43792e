use anyhow::{Context, Result};

/// Runtime configuration, read once at startup from the environment
/// (`.env` is loaded first when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    /// Channels a user must join before verification succeeds.
    pub required_channels: Vec<String>,
    /// Ids seeded into the admins table as owners at startup.
    pub default_owners: Vec<i64>,
    /// Target for the periodic notification; disabled when unset.
    pub notify_channel: Option<String>,
    pub notify_interval_secs: u64,
    /// Base URL of the chat-platform HTTP API (oracle + messaging sink).
    pub chat_api_url: String,
    pub oracle_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port: u16 = std::env::var("REWARDS_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("REWARDS_PORT must be a port number")?;
        let notify_interval_secs: u64 = std::env::var("REWARDS_NOTIFY_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .context("REWARDS_NOTIFY_INTERVAL_SECS must be an integer")?;
        let oracle_timeout_ms: u64 = std::env::var("REWARDS_ORACLE_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .context("REWARDS_ORACLE_TIMEOUT_MS must be an integer")?;

        let default_owners = parse_id_list(
            &std::env::var("REWARDS_DEFAULT_OWNERS").unwrap_or_default(),
        )
        .context("REWARDS_DEFAULT_OWNERS must be a comma-separated list of numeric ids")?;

        Ok(Self {
            db_path: std::env::var("REWARDS_DB_PATH").unwrap_or_else(|_| "rewards.db".into()),
            host: std::env::var("REWARDS_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            required_channels: parse_list(
                &std::env::var("REWARDS_REQUIRED_CHANNELS").unwrap_or_default(),
            ),
            default_owners,
            notify_channel: std::env::var("REWARDS_NOTIFY_CHANNEL").ok().filter(|s| !s.is_empty()),
            notify_interval_secs,
            chat_api_url: std::env::var("REWARDS_CHAT_API_URL")
                .unwrap_or_else(|_| "http://localhost:8081".into()),
            oracle_timeout_ms,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    parse_list(raw)
        .into_iter()
        .map(|s| s.parse::<i64>().with_context(|| format!("invalid id '{}'", s)))
        .collect()
}
