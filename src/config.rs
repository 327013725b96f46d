//! Startup configuration loaded from `ROBOTRON_*` environment variables.
//!
//! Read once at startup; missing required keys are fatal. Load `.env` (dotenvy)
//! before calling [`Config::from_env`].

use std::collections::HashSet;
use std::env;
use std::str::FromStr;

use crate::error::{BotError, Result};

const ENV_PREFIX: &str = "ROBOTRON_";

/// Measurement-unit convention inlined into the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureUnits {
    Metric,
    Imperial,
}

impl MeasureUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureUnits::Metric => "metric",
            MeasureUnits::Imperial => "imperial",
        }
    }
}

impl FromStr for MeasureUnits {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "metric" => Ok(MeasureUnits::Metric),
            "imperial" => Ok(MeasureUnits::Imperial),
            other => Err(BotError::Config(format!(
                "Invalid measure units {:?}; expected \"metric\" or \"imperial\"",
                other
            ))),
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub openai_api_key: String,
    /// Static allowlist of Telegram user ids permitted to talk to the bot.
    pub allowed_users: HashSet<i64>,
    pub measure_units: MeasureUnits,
    /// Log verbosity; an `EnvFilter` directive such as `info` or `debug`.
    pub log_level: String,
}

impl Config {
    /// Loads all keys from the environment.
    pub fn from_env() -> Result<Self> {
        let telegram_token = require("TELEGRAM_TOKEN")?;
        let openai_api_key = require("OPENAI_API_KEY")?;
        let allowed_users = parse_allowed_users(&require("ALLOWED_USERS")?)?;
        let measure_units = match optional("MEASURE_UNITS") {
            Some(raw) => raw.parse()?,
            None => MeasureUnits::Metric,
        };
        let log_level = optional("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            telegram_token,
            openai_api_key,
            allowed_users,
            measure_units,
            log_level,
        })
    }
}

fn require(key: &str) -> Result<String> {
    env::var(format!("{ENV_PREFIX}{key}"))
        .map_err(|_| BotError::Config(format!("{ENV_PREFIX}{key} not set")))
}

fn optional(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Parses a comma-separated list of numeric user ids; the allowlist must be
/// non-empty and every entry must parse.
fn parse_allowed_users(raw: &str) -> Result<HashSet<i64>> {
    let mut users = HashSet::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id: i64 = part.parse().map_err(|_| {
            BotError::Config(format!("Invalid user id {:?} in {ENV_PREFIX}ALLOWED_USERS", part))
        })?;
        users.insert(id);
    }
    if users.is_empty() {
        return Err(BotError::Config(format!(
            "{ENV_PREFIX}ALLOWED_USERS must list at least one user id"
        )));
    }
    Ok(users)
}
