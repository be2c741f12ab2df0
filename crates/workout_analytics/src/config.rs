use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::AnalyticsError;

pub const DEFAULT_CORE_API_BASE: &str = "http://core-api:3000";
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8000";

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the workout service that serves raw rows.
    pub core_api_base: String,
    /// SQLite file for report history; `None` keeps history in memory.
    pub reports_db_path: Option<PathBuf>,
    pub address: SocketAddr,
    pub request_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AnalyticsError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, AnalyticsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let core_api_base = get("CORE_API_BASE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CORE_API_BASE.into());
        let reports_db_path = get("REPORTS_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);
        let address = get("ADDRESS")
            .unwrap_or_else(|| DEFAULT_ADDRESS.into())
            .parse()
            .map_err(|e| AnalyticsError::Config(format!("ADDRESS: {e}")))?;
        let request_timeout = secs(&mut get, "REQUEST_TIMEOUT_SECS", 30)?;
        let upstream_timeout = secs(&mut get, "UPSTREAM_TIMEOUT_SECS", 10)?;
        Ok(Self {
            core_api_base,
            reports_db_path,
            address,
            request_timeout,
            upstream_timeout,
        })
    }
}

fn secs<F>(get: &mut F, key: &str, default: u64) -> Result<Duration, AnalyticsError>
where
    F: FnMut(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AnalyticsError::Config(format!("{key} must be a whole number of seconds"))),
    }
}
