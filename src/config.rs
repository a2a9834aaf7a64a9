use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ticker_min_secs")]
    pub ticker_min_secs: u64,
    #[serde(default = "default_ticker_max_secs")]
    pub ticker_max_secs: u64,
    #[serde(default = "default_renotify_after_secs")]
    pub renotify_after_secs: u64,
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout_secs() -> u64 {
    4
}

fn default_ticker_min_secs() -> u64 {
    10
}

fn default_ticker_max_secs() -> u64 {
    20
}

fn default_renotify_after_secs() -> u64 {
    600
}

impl AppConfig {
    /// Load settings from `RESTOCK_`-prefixed environment variables.
    /// Missing required fields fail here, before anything else starts.
    pub fn from_env() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Environment::with_prefix("RESTOCK"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_bot_token.is_empty() {
            return Err(ConfigError::Message(
                "telegram_bot_token must not be empty".into(),
            ));
        }

        if self.telegram_chat_id.is_empty() {
            return Err(ConfigError::Message(
                "telegram_chat_id must not be empty".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.ticker_min_secs >= self.ticker_max_secs {
            return Err(ConfigError::Message(
                "ticker_min_secs must be less than ticker_max_secs".into(),
            ));
        }

        if self.renotify_after_secs == 0 {
            return Err(ConfigError::Message(
                "renotify_after_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ticker_min(&self) -> Duration {
        Duration::from_secs(self.ticker_min_secs)
    }

    pub fn ticker_max(&self) -> Duration {
        Duration::from_secs(self.ticker_max_secs)
    }

    pub fn renotify_after(&self) -> Duration {
        Duration::from_secs(self.renotify_after_secs)
    }
}
