//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::event::event_bus::RetryPolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    /// Attempts per handler before a transient failure is dropped. Never below 1.
    pub handler_max_attempts: u32,
    pub handler_retry_delay: Duration,
    pub reconcile_on_startup: bool,
    /// Malformed variables that fell back to their default. Logged by the
    /// binary once logging is up.
    pub env_warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "sqlite://data/pressroom.db".to_string(),
            db_path: "data/pressroom.db".to_string(),
            logs_path: PathBuf::from("logs"),
            handler_max_attempts: 3,
            handler_retry_delay: Duration::from_millis(50),
            reconcile_on_startup: false,
            env_warnings: Vec::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let defaults = Self::default();
        let mut warnings = Vec::new();
        Self {
            db_url: std::env::var("DB_URL").unwrap_or(defaults.db_url),
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            logs_path: std::env::var("LOGS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.logs_path),
            handler_max_attempts: parse_env(
                "HANDLER_MAX_ATTEMPTS",
                defaults.handler_max_attempts,
                &mut warnings,
            )
            .max(1),
            handler_retry_delay: Duration::from_millis(parse_env(
                "HANDLER_RETRY_DELAY_MS",
                defaults.handler_retry_delay.as_millis() as u64,
                &mut warnings,
            )),
            reconcile_on_startup: parse_env(
                "RECONCILE_ON_STARTUP",
                defaults.reconcile_on_startup,
                &mut warnings,
            ),
            env_warnings: warnings,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.handler_max_attempts,
            delay: self.handler_retry_delay,
        }
    }
}

fn parse_env<T: FromStr + Copy + std::fmt::Debug>(
    key: &str,
    default: T,
    warnings: &mut Vec<String>,
) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warnings.push(format!(
                "Invalid value {raw:?} for {key}, using default {default:?}"
            ));
            default
        }),
        Err(_) => default,
    }
}
