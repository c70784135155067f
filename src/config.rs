use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub notifier_webhook_url: String,
    pub notifier_timeout_seconds: u64,
    pub operator_rps: u32,
    pub public_rps: u32,
    pub requalify_batch_size: i64,
    pub expiry_sweep_interval_seconds: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            notifier_webhook_url: get_env("NOTIFIER_WEBHOOK_URL")?,
            notifier_timeout_seconds: get_env_parse_or("NOTIFIER_TIMEOUT_SECONDS", 10)?,
            operator_rps: get_env_parse("OPERATOR_RPS")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            requalify_batch_size: get_env_parse_or("REQUALIFY_BATCH_SIZE", 500)?,
            expiry_sweep_interval_seconds: get_env_parse_or("EXPIRY_SWEEP_INTERVAL_SECONDS", 60)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
