use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const ADDR_VAR: &str = "TWITTER_API_ADDR";
pub const STORE_VAR: &str = "TWITTER_API_STORE";
pub const WORKERS_VAR: &str = "TWITTER_API_WORKERS";
pub const BCRYPT_COST_VAR: &str = "TWITTER_API_BCRYPT_COST";

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_STORE: &str = "users.json";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_path: PathBuf,
    pub workers: usize,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, applying defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse(ADDR_VAR, lookup(ADDR_VAR), DEFAULT_ADDR.to_string(), |raw| {
            raw.parse::<SocketAddr>().map_err(|e| e.to_string())
        })?;

        let store_path = match lookup(STORE_VAR) {
            Some(raw) if raw.trim().is_empty() => {
                return Err(ConfigError {
                    key: STORE_VAR,
                    value: raw,
                    reason: "path must not be empty".to_string(),
                })
            }
            Some(raw) => PathBuf::from(raw),
            None => PathBuf::from(DEFAULT_STORE),
        };

        let workers = parse(WORKERS_VAR, lookup(WORKERS_VAR), num_cpus::get().to_string(), |raw| {
            match raw.parse::<usize>() {
                Ok(0) => Err("must be at least 1".to_string()),
                Ok(n) => Ok(n),
                Err(e) => Err(e.to_string()),
            }
        })?;

        let bcrypt_cost = parse(
            BCRYPT_COST_VAR,
            lookup(BCRYPT_COST_VAR),
            bcrypt::DEFAULT_COST.to_string(),
            |raw| match raw.parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => Ok(cost),
                Ok(_) => Err("must be between 4 and 31".to_string()),
                Err(e) => Err(e.to_string()),
            },
        )?;

        Ok(Config {
            bind_addr,
            store_path,
            workers,
            bcrypt_cost,
        })
    }
}

fn parse<T>(
    key: &'static str,
    value: Option<String>,
    default: String,
    f: impl FnOnce(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    let value = value.unwrap_or(default);
    let parsed = f(value.trim());
    parsed.map_err(|reason| ConfigError { key, value, reason })
}
