use crate::ble::speed::DEFAULT_WHEEL_CIRCUMFERENCE_MM;
use btleplug::api::BDAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("wheel circumference must be a positive number of millimetres")]
    NonPositiveCircumference,
    #[error("at least one connection attempt is required")]
    NoConnectAttempts,
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wheel_circumference_mm: u32,
    // When set, only this exact device is used. Otherwise the first device
    // whose name contains `device_name`.
    pub device_address: Option<BDAddr>,
    pub device_name: String,
    pub connect_attempts: u32,
    pub connect_timeout: Duration,
    pub retry_delay: Duration,
    pub reconnect_delay: Duration,
    pub scan_duration: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            wheel_circumference_mm: DEFAULT_WHEEL_CIRCUMFERENCE_MM,
            device_address: None,
            device_name: "Polar".to_string(),
            connect_attempts: 3,
            connect_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            reconnect_delay: Duration::from_secs(10),
            scan_duration: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    // Anything not set keeps its default.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let config = Config {
            wheel_circumference_mm: parsed(&lookup, "CSC_WHEEL_CIRCUMFERENCE_MM")?
                .unwrap_or(defaults.wheel_circumference_mm),
            device_address: parsed(&lookup, "CSC_DEVICE_ADDRESS")?,
            device_name: lookup("CSC_DEVICE_NAME").unwrap_or(defaults.device_name),
            connect_attempts: parsed(&lookup, "CSC_CONNECT_ATTEMPTS")?
                .unwrap_or(defaults.connect_attempts),
            connect_timeout: seconds(&lookup, "CSC_CONNECT_TIMEOUT_SECS")?
                .unwrap_or(defaults.connect_timeout),
            retry_delay: seconds(&lookup, "CSC_RETRY_DELAY_SECS")?.unwrap_or(defaults.retry_delay),
            reconnect_delay: seconds(&lookup, "CSC_RECONNECT_DELAY_SECS")?
                .unwrap_or(defaults.reconnect_delay),
            scan_duration: seconds(&lookup, "CSC_SCAN_SECS")?.unwrap_or(defaults.scan_duration),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wheel_circumference_mm == 0 {
            return Err(ConfigError::NonPositiveCircumference);
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::NoConnectAttempts);
        }
        Ok(())
    }
}

fn parsed<T: FromStr, F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn seconds<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    Ok(parsed(lookup, key)?.map(Duration::from_secs))
}
