//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram Bot API token.
    pub bot_token: SecretString,
    /// Path to the local database file.
    pub db_path: String,
    /// getUpdates long-poll timeout in seconds.
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// `MATCHPOINT_BOT_TOKEN` is required; `MATCHPOINT_DB_PATH` and
    /// `MATCHPOINT_POLL_TIMEOUT_SECS` have defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("MATCHPOINT_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("MATCHPOINT_BOT_TOKEN".into()))?;

        let db_path = std::env::var("MATCHPOINT_DB_PATH")
            .unwrap_or_else(|_| "./data/matchpoint.db".to_string());

        let poll_timeout_secs = match std::env::var("MATCHPOINT_POLL_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MATCHPOINT_POLL_TIMEOUT_SECS".into(),
                message: format!("expected an integer, got {raw:?}"),
            })?,
            Err(_) => 30,
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            db_path,
            poll_timeout_secs,
        })
    }
}
