//! Configuration management for Sealchain

use crate::blockchain::{DEFAULT_DIFFICULTY, DEFAULT_MINER_REWARD};
use crate::error::ChainError;
use crate::miner::MAX_DIFFICULTY;
use crate::transaction::Amount;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_miner_reward")]
    pub miner_reward: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            miner_reward: default_miner_reward(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MinerConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Abort a sealing search after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            timeout_secs: None,
        }
    }
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_miner_reward() -> u64 {
    DEFAULT_MINER_REWARD
}

fn default_threads() -> usize {
    1
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.chain.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "chain.difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.chain.difficulty
            )));
        }
        if Amount::checked_from_num(self.chain.miner_reward).is_none() {
            return Err(ChainError::ConfigError(format!(
                "chain.miner_reward must be at most {}, got {}",
                Amount::MAX.to_num::<u64>(),
                self.chain.miner_reward
            )));
        }
        if self.miner.threads == 0 {
            return Err(ChainError::ConfigError(
                "miner.threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    let config: Config = toml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

/// Loads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    match fs::read_to_string(path.as_ref()) {
        Ok(config_str) => parse_config(&config_str),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.chain.difficulty, 2);
        assert_eq!(config.chain.miner_reward, 50);
        assert_eq!(config.miner.threads, 1);
        assert_eq!(config.miner.timeout_secs, None);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chain]\ndifficulty = 3\n\n[miner]\nthreads = 4\ntimeout_secs = 10").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.chain.difficulty, 3);
        assert_eq!(config.chain.miner_reward, 50);
        assert_eq!(config.miner.threads, 4);
        assert_eq!(config.miner.timeout_secs, Some(10));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            parse_config("[chain]\ndifficulty = 65"),
            Err(ChainError::ConfigError(_))
        ));
        assert!(matches!(
            parse_config("[chain]\nminer_reward = 5000000000"),
            Err(ChainError::ConfigError(msg)) if msg.contains("miner_reward")
        ));
        assert!(matches!(
            parse_config("[miner]\nthreads = 0"),
            Err(ChainError::ConfigError(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(
            parse_config("[chain\ndifficulty = "),
            Err(ChainError::ConfigError(_))
        ));
    }
}
