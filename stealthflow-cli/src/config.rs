//! Environment configuration for the CLI.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use stealthflow_core::constants::{
    DEFAULT_BATCH_BLOCKS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TOKEN_DECIMALS, STEALTH_ACCOUNT_CLASS_HASH,
    STRK_TOKEN_ADDRESS, UDC_ADDRESS,
};
use stealthflow_core::types::U256;
use stealthflow_core::TokenUnits;
use stealthflow_crypto::AccountDeployment;
use stealthflow_scanner::ScannerConfig;

/// Default registry file, relative to the working directory.
pub const DEFAULT_REGISTRY_PATH: &str = "stealthflow.sflw";

/// Settings shared by all commands.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub registry: PathBuf,
    pub deployment: AccountDeployment,
    pub token: U256,
    pub units: TokenUnits,
    pub poll_interval: Duration,
    pub batch_blocks: u64,
}

impl CliConfig {
    /// Reads the process environment after loading `.env`, if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let word = |key: &str, default: U256| -> Result<U256> {
            match get(key) {
                Some(value) => value.parse().with_context(|| format!("Invalid {}", key)),
                None => Ok(default),
            }
        };
        let number = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(value) => value.trim().parse().with_context(|| format!("Invalid {}", key)),
                None => Ok(default),
            }
        };

        let decimals = number("STEALTHFLOW_DECIMALS", DEFAULT_TOKEN_DECIMALS as u64)?;
        let units = u32::try_from(decimals)
            .ok()
            .and_then(|d| TokenUnits::new(d).ok())
            .with_context(|| format!("Unsupported STEALTHFLOW_DECIMALS: {}", decimals))?;

        Ok(Self {
            registry: get("STEALTHFLOW_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or_else(|| DEFAULT_REGISTRY_PATH.into()),
            deployment: AccountDeployment {
                class_hash: word("STEALTH_ACCOUNT_CLASS_HASH", STEALTH_ACCOUNT_CLASS_HASH)?,
                deployer: word("STEALTHFLOW_DEPLOYER", UDC_ADDRESS)?,
            },
            token: word("STEALTHFLOW_TOKEN", STRK_TOKEN_ADDRESS)?,
            units,
            poll_interval: Duration::from_millis(number("STEALTHFLOW_POLL_MS", DEFAULT_POLL_INTERVAL_MS)?),
            batch_blocks: number("STEALTHFLOW_BATCH_BLOCKS", DEFAULT_BATCH_BLOCKS)?,
        })
    }

    /// Scanner settings derived from the environment.
    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig::new()
            .batch_blocks(self.batch_blocks)
            .poll_interval(self.poll_interval)
            .token(self.token)
            .deployment(self.deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<CliConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.registry, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.deployment, AccountDeployment::default());
        assert_eq!(config.token, STRK_TOKEN_ADDRESS);
        assert_eq!(config.units.decimals(), DEFAULT_TOKEN_DECIMALS);
        assert_eq!(config.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("STEALTHFLOW_REGISTRY", "/tmp/ledger.sflw"),
            ("STEALTH_ACCOUNT_CLASS_HASH", "0x1234"),
            ("STEALTHFLOW_DEPLOYER", "99"),
            ("STEALTHFLOW_DECIMALS", "6"),
            ("STEALTHFLOW_POLL_MS", "250"),
            ("STEALTHFLOW_BATCH_BLOCKS", "10"),
        ])
        .unwrap();

        assert_eq!(config.registry, PathBuf::from("/tmp/ledger.sflw"));
        assert_eq!(config.deployment.class_hash, U256::from_u64(0x1234));
        assert_eq!(config.deployment.deployer, U256::from_u64(99));
        assert_eq!(config.units.decimals(), 6);

        let scanner = config.scanner_config();
        assert_eq!(scanner.batch_blocks, 10);
        assert_eq!(scanner.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("STEALTHFLOW_TOKEN", "0xzz")]).is_err());
        assert!(config(&[("STEALTHFLOW_DECIMALS", "100")]).is_err());
        assert!(config(&[("STEALTHFLOW_POLL_MS", "-1")]).is_err());
    }
}
