//! Configuration management for the rebalancer.
//!
//! Loads settings from an optional `config` file, `REBAL__*` environment
//! variables, and finally the flat variables the service has always read
//! (`BINANCE_API_KEY`, `BINANCE_API_SECRET`, `MAX_TRADE_VALUE_USD`, `PORT`,
//! `APP_ENV`, `NODE_ENV`).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Binance API credentials and transport
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Rebalance limits and execution timing
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,
    /// Deployment environment; development forces simulation
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default)]
    pub testnet: bool,
    /// Override for the REST base URL (mostly for tests)
    #[serde(default)]
    pub base_url: Option<String>,
    /// recvWindow sent with signed requests, in milliseconds
    #[serde(default = "default_recv_window_ms")]
    pub recv_window_ms: u64,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceConfig {
    /// Largest imbalance (quote currency) a single rebalance may trade
    #[serde(default = "default_max_trade_value_usd")]
    pub max_trade_value_usd: Decimal,
    /// Wait between Earn redemption and order placement
    #[serde(default = "default_settlement_delay_secs")]
    pub settlement_delay_secs: u64,
    /// Multiplier on the quote amount redeemed before a buy (1.10 = +10%)
    #[serde(default = "default_redeem_buffer")]
    pub redeem_buffer: Decimal,
    /// Serialize concurrent rebalances of the same pair
    #[serde(default = "default_serialize_pairs")]
    pub serialize_pairs: bool,
}

impl RebalanceConfig {
    pub fn settlement_delay(&self) -> Duration {
        Duration::from_secs(self.settlement_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!("unknown environment: {other}"),
        }
    }
}

// Default value functions
fn default_recv_window_ms() -> u64 {
    60_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_trade_value_usd() -> Decimal {
    Decimal::new(100, 0) // $100
}

fn default_settlement_delay_secs() -> u64 {
    5
}

fn default_redeem_buffer() -> Decimal {
    Decimal::new(110, 2) // 1.10
}

fn default_serialize_pairs() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("REBAL"))
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply the flat legacy environment variables on top of layered config.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("BINANCE_API_KEY") {
            self.binance.api_key = key;
        }
        if let Some(secret) = lookup("BINANCE_API_SECRET") {
            self.binance.secret_key = secret;
        }
        if let Some(limit) = lookup("MAX_TRADE_VALUE_USD") {
            self.rebalance.max_trade_value_usd = Decimal::from_str(limit.trim())
                .with_context(|| format!("MAX_TRADE_VALUE_USD is not a number: {limit}"))?;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = env.parse()?;
        }
        // NODE_ENV only ever switches simulation on
        if lookup("NODE_ENV").is_some_and(|env| env.trim().eq_ignore_ascii_case("development")) {
            self.environment = Environment::Development;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.rebalance.max_trade_value_usd >= Decimal::ZERO,
            "max_trade_value_usd must not be negative"
        );

        anyhow::ensure!(
            self.rebalance.redeem_buffer >= Decimal::ONE,
            "redeem_buffer must be at least 1.0"
        );

        anyhow::ensure!(
            self.binance.timeout_secs > 0,
            "binance.timeout_secs must be positive"
        );

        Ok(())
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            testnet: false,
            base_url: None,
            recv_window_ms: default_recv_window_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            max_trade_value_usd: default_max_trade_value_usd(),
            settlement_delay_secs: default_settlement_delay_secs(),
            redeem_buffer: default_redeem_buffer(),
            serialize_pairs: default_serialize_pairs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
