//! Configuration from environment variables and `.env` files.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PAIRCTL_PHASE_TIMEOUT_SECS` | 30 | upper bound on each pairing phase |
//! | `PAIRCTL_MAX_FAILED_OUTCOMES` | 1024 | failure outcomes remembered, `0` = no limit |
//! | `PAIRCTL_LOG` | `pairctl=info` | log filter when `RUST_LOG` is unset |
//! | `PAIRCTL_LOG_FORMAT` | `pretty` | `pretty` or `json` |

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

const PHASE_TIMEOUT_KEY: &str = "PAIRCTL_PHASE_TIMEOUT_SECS";
const MAX_FAILED_OUTCOMES_KEY: &str = "PAIRCTL_MAX_FAILED_OUTCOMES";
const LOG_FILTER_KEY: &str = "PAIRCTL_LOG";
const LOG_FORMAT_KEY: &str = "PAIRCTL_LOG_FORMAT";

const DEFAULT_PHASE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_FAILED_OUTCOMES: usize = 1024;
const DEFAULT_LOG_FILTER: &str = "pairctl=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{}'", other)),
        }
    }
}

/// Logging settings (`PAIRCTL_LOG`, `PAIRCTL_LOG_FORMAT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Human-readable or JSON lines on stderr.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Process-wide pairing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfig {
    /// Upper bound on each of connect, transfer and install.
    pub phase_timeout: Duration,
    /// Failure outcomes remembered before the oldest is evicted. `None`
    /// keeps every failure outcome.
    pub max_failed_outcomes: Option<usize>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            phase_timeout: Duration::from_secs(DEFAULT_PHASE_TIMEOUT_SECS),
            max_failed_outcomes: Some(DEFAULT_MAX_FAILED_OUTCOMES),
            logging: LoggingConfig::default(),
        }
    }
}

impl PairingConfig {
    /// Load from the process environment, after applying a `.env` file in
    /// the working directory if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from a `.env` file only. The process environment is neither read
    /// nor modified.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(map_dotenv_error)? {
            let (key, value) = item.map_err(map_dotenv_error)?;
            vars.insert(key, value);
        }
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let phase_timeout = match lookup(PHASE_TIMEOUT_KEY) {
            Some(raw) => {
                let secs = parse_number::<u64>(PHASE_TIMEOUT_KEY, &raw)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: PHASE_TIMEOUT_KEY.to_string(),
                        message: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.phase_timeout,
        };

        let max_failed_outcomes = match lookup(MAX_FAILED_OUTCOMES_KEY) {
            Some(raw) => match parse_number::<usize>(MAX_FAILED_OUTCOMES_KEY, &raw)? {
                0 => None,
                n => Some(n),
            },
            None => defaults.max_failed_outcomes,
        };

        let filter = lookup(LOG_FILTER_KEY)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(defaults.logging.filter);

        let format = match lookup(LOG_FORMAT_KEY) {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: LOG_FORMAT_KEY.to_string(),
                    message,
                })?,
            None => defaults.logging.format,
        };

        Ok(Self {
            phase_timeout,
            max_failed_outcomes,
            logging: LoggingConfig { filter, format },
        })
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{}': {}", raw, e),
        })
}

fn map_dotenv_error(err: dotenvy::Error) -> ConfigError {
    match err {
        dotenvy::Error::Io(io) => ConfigError::Io(io),
        other => ConfigError::ParseError(other.to_string()),
    }
}
