use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{DEFAULT_DIFFICULTY, MINING_REWARD, PROGRESS_TICK_MS};
use crate::error::ConfigError;

/// How history entries are matched against mined blocks during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileRule {
    /// Match on (sender, recipient, amount). Duplicate transfers are
    /// indistinguishable and all resolve to the first matching block.
    #[default]
    FieldTuple,
    /// Match on the transaction id carried inside the block.
    TransactionId,
}

impl FromStr for ReconcileRule {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fields" | "field_tuple" => Ok(Self::FieldTuple),
            "id" | "transaction_id" => Ok(Self::TransactionId),
            _ => Err(()),
        }
    }
}

/// Chain and miner tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub difficulty: u32,
    pub mining_reward: u64,
    pub progress_tick: Duration,
    /// Re-queue transfers enqueued while a block was being mined instead of
    /// dropping them on the post-mining reset.
    pub carry_over_pending: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: MINING_REWARD,
            progress_tick: Duration::from_millis(PROGRESS_TICK_MS),
            carry_over_pending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub chain: ChainConfig,
    pub reconcile_rule: ReconcileRule,
}

impl AppConfig {
    /// Read settings from the process environment (after `dotenvy` has run).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ChainConfig::default();
        let chain = ChainConfig {
            difficulty: parse_var(&lookup, "DIFFICULTY", defaults.difficulty)?,
            mining_reward: parse_var(&lookup, "MINING_REWARD", defaults.mining_reward)?,
            progress_tick: Duration::from_millis(parse_var(
                &lookup,
                "PROGRESS_TICK_MS",
                PROGRESS_TICK_MS,
            )?),
            carry_over_pending: parse_var(&lookup, "CARRY_OVER_PENDING", false)?,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT", 8080)?,
            chain,
            reconcile_rule: parse_var(&lookup, "RECONCILE_RULE", ReconcileRule::default())?,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.chain, ChainConfig::default());
        assert_eq!(cfg.chain.difficulty, 4);
        assert_eq!(cfg.chain.mining_reward, 10);
        assert_eq!(cfg.reconcile_rule, ReconcileRule::FieldTuple);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config_from(&[
            ("PORT", "9000"),
            ("DIFFICULTY", "2"),
            ("MINING_REWARD", "25"),
            ("PROGRESS_TICK_MS", "50"),
            ("CARRY_OVER_PENDING", "true"),
            ("RECONCILE_RULE", "id"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.chain.difficulty, 2);
        assert_eq!(cfg.chain.mining_reward, 25);
        assert_eq!(cfg.chain.progress_tick, Duration::from_millis(50));
        assert!(cfg.chain.carry_over_pending);
        assert_eq!(cfg.reconcile_rule, ReconcileRule::TransactionId);
    }

    #[test]
    fn malformed_value_names_the_key() {
        let err = config_from(&[("DIFFICULTY", "hard")]).unwrap_err();
        match err {
            ConfigError::Invalid { key, value } => {
                assert_eq!(key, "DIFFICULTY");
                assert_eq!(value, "hard");
            }
        }
        assert!(config_from(&[("RECONCILE_RULE", "fuzzy")]).is_err());
    }
}
