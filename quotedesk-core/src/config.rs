use std::env;
use std::str::FromStr;

use crate::automation::DEFAULT_LOG_CAP;
use crate::error::ConfigError;
use crate::state_machine::TransitionPolicy;

/// Worker configuration read from the environment.
///
/// Call `dotenv().ok()` first so `.env` values are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// PostgreSQL URL; the in-memory store is used when unset
    pub database_url: Option<String>,

    pub max_connections: u32,

    /// How often the scheduler wakes up to try the daily pass
    pub poll_interval_seconds: u64,

    /// Company name used in rendered notifications
    pub company_name: String,

    /// Days between issuance and expiry for new quotes
    pub quote_expiry_days: u32,

    /// Number of execution log entries kept
    pub log_cap: usize,

    pub transition_policy: TransitionPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            poll_interval_seconds: 3600,
            company_name: "La mia azienda".to_string(),
            quote_expiry_days: 30,
            log_cap: DEFAULT_LOG_CAP,
            transition_policy: TransitionPolicy::Permissive,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strict = match get("STRICT_TRANSITIONS") {
            Some(value) => parse_bool("STRICT_TRANSITIONS", &value)?,
            None => false,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.max_connections,
            )?,
            poll_interval_seconds: parse_or(
                "WORKER_POLL_INTERVAL_SECONDS",
                get("WORKER_POLL_INTERVAL_SECONDS"),
                defaults.poll_interval_seconds,
            )?,
            company_name: get("COMPANY_NAME").unwrap_or(defaults.company_name),
            quote_expiry_days: parse_or(
                "QUOTE_EXPIRY_DAYS",
                get("QUOTE_EXPIRY_DAYS"),
                defaults.quote_expiry_days,
            )?,
            log_cap: parse_or(
                "AUTOMATION_LOG_CAP",
                get("AUTOMATION_LOG_CAP"),
                defaults.log_cap,
            )?,
            transition_policy: if strict {
                TransitionPolicy::Strict
            } else {
                TransitionPolicy::Permissive
            },
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
