use crate::contracts::REGISTRY_ADDRESS;
use anyhow::{bail, Context, Result};
use ethers::types::Address;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Registry chain
    pub rpc_url: String,
    pub rpc_fallback: Option<String>,
    pub registry_address: Address,

    // Projection store
    pub db_path: PathBuf,

    // Reconciliation
    pub poll_interval: Duration,
    pub lookback_blocks: u64,
    pub log_timeout: Duration,
    pub detail_timeout: Duration,
    pub detail_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            environment: Self::parse_environment(&var("ENVIRONMENT", "development"))?,
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "3000").parse().context("Invalid PORT")?,

            rpc_url: lookup("RPC_URL").context("RPC_URL required")?,
            rpc_fallback: lookup("RPC_FALLBACK"),
            registry_address: Self::parse_address(
                "REGISTRY_ADDRESS",
                &var("REGISTRY_ADDRESS", REGISTRY_ADDRESS),
            )?,

            db_path: PathBuf::from(var("DB_PATH", "asap.sled")),

            poll_interval: Duration::from_secs(
                var("POLL_INTERVAL_SECS", "30")
                    .parse()
                    .context("Invalid POLL_INTERVAL_SECS")?,
            ),
            lookback_blocks: var("LOOKBACK_BLOCKS", "5000")
                .parse()
                .context("Invalid LOOKBACK_BLOCKS")?,
            log_timeout: Duration::from_secs(
                var("LOG_TIMEOUT_SECS", "20")
                    .parse()
                    .context("Invalid LOG_TIMEOUT_SECS")?,
            ),
            detail_timeout: Duration::from_secs(
                var("DETAIL_TIMEOUT_SECS", "10")
                    .parse()
                    .context("Invalid DETAIL_TIMEOUT_SECS")?,
            ),
            detail_concurrency: var("DETAIL_CONCURRENCY", "4")
                .parse()
                .context("Invalid DETAIL_CONCURRENCY")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment(env: &str) -> Result<Environment> {
        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_address(var: &str, value: &str) -> Result<Address> {
        Address::from_str(value).with_context(|| format!("Invalid address for {}", var))
    }

    fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http") {
            bail!("RPC_URL must be HTTP(S) URL");
        }
        if let Some(fallback) = &self.rpc_fallback {
            if !fallback.starts_with("http") {
                bail!("RPC_FALLBACK must be HTTP(S) URL");
            }
        }
        if self.registry_address.is_zero() {
            bail!("REGISTRY_ADDRESS must not be the zero address");
        }
        if self.lookback_blocks == 0 {
            bail!("LOOKBACK_BLOCKS must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        if self.detail_concurrency == 0 {
            bail!("DETAIL_CONCURRENCY must be greater than zero");
        }
        if self.log_timeout.is_zero() || self.detail_timeout.is_zero() {
            bail!("RPC timeouts must be greater than zero");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}
