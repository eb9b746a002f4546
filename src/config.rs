//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. Broker
//! credentials are only ever read from the environment.

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("monitor.cycle_interval_secs", self.monitor.cycle_interval_secs),
            ("monitor.cooldown_secs", self.monitor.cooldown_secs),
            ("monitor.candle_pacing_ms", self.monitor.candle_pacing_ms),
            ("monitor.history_len", self.monitor.history_len as u64),
            ("broker.timeout_secs", self.broker.timeout_secs),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{} must be > 0", name)));
        }
        if self.broker.exchange.trim().is_empty() {
            return Err(ConfigError::Invalid("exchange must not be empty".into()));
        }
        let (open, close) = (self.session.open_time()?, self.session.close_time()?);
        if open >= close {
            return Err(ConfigError::Invalid(format!(
                "session open {} must precede close {}",
                open, close
            )));
        }
        self.session.offset()?;
        Ok(())
    }
}

/// Broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub exchange: String,
    pub candle_interval: String,
    pub timeout_secs: u64,
    pub client_local_ip: String,
    pub client_public_ip: String,
    pub mac_address: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            exchange: "NSE".to_string(),
            candle_interval: "ONE_MINUTE".to_string(),
            timeout_secs: 30,
            client_local_ip: "127.0.0.1".to_string(),
            client_public_ip: "127.0.0.1".to_string(),
            mac_address: "00:00:00:00:00:00".to_string(),
        }
    }
}

/// Trading session window and its fixed timezone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Offset from UTC in minutes (330 = Asia/Kolkata)
    pub utc_offset_minutes: i32,
    /// Session open, "HH:MM"
    pub open: String,
    /// Session close, "HH:MM"
    pub close: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            utc_offset_minutes: 330,
            open: "09:15".to_string(),
            close: "15:30".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid(format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
        })
    }

    pub fn open_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm(&self.open)
    }

    pub fn close_time(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm(&self.close)
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| ConfigError::Invalid(format!("bad session time {:?}: {}", value, e)))
}

/// Live monitor timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Period between cycle starts
    pub cycle_interval_secs: u64,
    /// Minimum spacing between two alerts for one symbol
    pub cooldown_secs: u64,
    /// Number of cycles kept in the alert history
    pub history_len: usize,
    /// Delay between successive candle lookups
    pub candle_pacing_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            cycle_interval_secs: 60,
            cooldown_secs: 60,
            history_len: 10,
            candle_pacing_ms: 1500,
        }
    }
}

impl MonitorConfig {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }

    pub fn candle_pacing(&self) -> Duration {
        Duration::from_millis(self.candle_pacing_ms)
    }
}

/// Broker login credentials, environment only
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub mpin: String,
    pub totp_key: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub const VARS: [&'static str; 4] = ["CLIENT_ID", "MPIN", "TOTP_KEY", "API_KEY"];

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds credentials from any variable lookup; every missing or blank
    /// variable is reported at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let values: Vec<Option<String>> = Self::VARS
            .iter()
            .map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<&'static str> = Self::VARS
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials(missing));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();
        Ok(Credentials {
            client_id: next(),
            mpin: next(),
            totp_key: next(),
            api_key: next(),
        })
    }
}
