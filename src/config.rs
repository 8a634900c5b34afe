use crate::domain::Address;
use crate::events::TrackedContracts;
use crate::rpc::BatchConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub geth_url: String,
    pub database_path: String,
    pub seawater_addr: Address,
    pub thirdweb_factory_addr: Option<Address>,
    pub leo_addr: Option<Address>,
    pub heartbeat_url: Option<String>,
    pub fusdc_decimals: u32,
    pub pagination_min: u64,
    pub pagination_max: u64,
    pub poll_wait: Duration,
    pub batch_min: usize,
    pub batch_max: usize,
    pub rpc_workers: usize,
    pub rpc_timeout: Duration,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::parse(value).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn number<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match optional(env_map, key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("must be a number, got {}", raw))
        }),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let geth_url = required(&env_map, "SPN_GETH_URL")?;
        let database_path = required(&env_map, "DATABASE_PATH")?;
        let seawater_addr = address(
            "SPN_SEAWATER_ADDR",
            &required(&env_map, "SPN_SEAWATER_ADDR")?,
        )?;

        let thirdweb_factory_addr = optional(&env_map, "SPN_THIRDWEB_ACCOUNT_FACTORY_ADDR")
            .map(|v| address("SPN_THIRDWEB_ACCOUNT_FACTORY_ADDR", &v))
            .transpose()?;
        let leo_addr = optional(&env_map, "SPN_LEO_ADDR")
            .map(|v| address("SPN_LEO_ADDR", &v))
            .transpose()?;

        let pagination_min = number(&env_map, "SPN_PAGINATION_MIN", 1000u64)?;
        let pagination_max = number(&env_map, "SPN_PAGINATION_MAX", 5000u64)?;
        if pagination_min == 0 {
            return Err(ConfigError::InvalidValue(
                "SPN_PAGINATION_MIN".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if pagination_min > pagination_max {
            return Err(ConfigError::InvalidValue(
                "SPN_PAGINATION_MAX".to_string(),
                format!("must be at least SPN_PAGINATION_MIN ({})", pagination_min),
            ));
        }

        let batch_min = number(&env_map, "SPN_BATCH_MIN", 100usize)?;
        let batch_max = number(&env_map, "SPN_BATCH_MAX", 200usize)?;
        if batch_min == 0 {
            return Err(ConfigError::InvalidValue(
                "SPN_BATCH_MIN".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if batch_min > batch_max {
            return Err(ConfigError::InvalidValue(
                "SPN_BATCH_MAX".to_string(),
                format!("must be at least SPN_BATCH_MIN ({})", batch_min),
            ));
        }

        Ok(Config {
            geth_url,
            database_path,
            seawater_addr,
            thirdweb_factory_addr,
            leo_addr,
            heartbeat_url: optional(&env_map, "SPN_HEARTBEAT_URL"),
            fusdc_decimals: number(&env_map, "SPN_FUSDC_DECIMALS", 6u32)?,
            pagination_min,
            pagination_max,
            poll_wait: Duration::from_secs(number(&env_map, "SPN_POLL_WAIT_SECS", 4u64)?),
            batch_min,
            batch_max,
            rpc_workers: number(&env_map, "SPN_RPC_WORKERS", 100usize)?,
            rpc_timeout: Duration::from_secs(number(&env_map, "SPN_RPC_TIMEOUT_SECS", 60u64)?),
            debug: env_map.contains_key("SPN_DEBUG"),
        })
    }

    /// Emitters the ingestor validates against.
    ///
    /// # Errors
    /// Returns `MissingEnv` if an ingestor-only address is unset.
    pub fn tracked_contracts(&self) -> Result<TrackedContracts, ConfigError> {
        let missing = |key: &str| ConfigError::MissingEnv(key.to_string());
        Ok(TrackedContracts {
            seawater: self.seawater_addr.clone(),
            thirdweb_factory: self
                .thirdweb_factory_addr
                .clone()
                .ok_or_else(|| missing("SPN_THIRDWEB_ACCOUNT_FACTORY_ADDR"))?,
            leo: self
                .leo_addr
                .clone()
                .ok_or_else(|| missing("SPN_LEO_ADDR"))?,
        })
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            min_batch: self.batch_min,
            max_batch: self.batch_max,
            min_workers: self.rpc_workers,
            ..BatchConfig::default()
        }
    }
}
