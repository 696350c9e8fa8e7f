//! Router configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env::{self, VarError};

use crate::error::{Result, RouterError};
use crate::strategy::LoadBalancingStrategy;

/// Environment variable holding the seed for the default policy
pub const ENV_RNG_SEED: &str = "ROUTER_RNG_SEED";

/// Environment variable mapping server types to built-in strategies,
/// e.g. `room=session-affinity,match=round-robin`
pub const ENV_STRATEGIES: &str = "ROUTER_STRATEGIES";

/// Router configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Seed for the default random policy. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,

    /// Built-in strategies to register per server type
    pub strategies: BTreeMap<String, LoadBalancingStrategy>,
}

impl RouterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let rng_seed = match read_env(ENV_RNG_SEED)? {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                RouterError::InvalidConfig(format!("{}={}: {}", ENV_RNG_SEED, raw, e))
            })?),
            None => None,
        };

        let strategies = match read_env(ENV_STRATEGIES)? {
            Some(raw) => parse_strategies(&raw)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            rng_seed,
            strategies,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_strategy(
        mut self,
        server_type: impl Into<String>,
        strategy: LoadBalancingStrategy,
    ) -> Self {
        self.strategies.insert(server_type.into(), strategy);
        self
    }
}

/// Read an environment variable; unset is `None`, non-UTF-8 is an error
fn read_env(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(raw) => Ok(Some(raw)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(RouterError::InvalidConfig(format!(
            "{} is not valid UTF-8: {:?}",
            name, raw
        ))),
    }
}

/// Parse `type=strategy` pairs separated by commas.
///
/// Blank entries are skipped; a repeated server type keeps the last value.
pub fn parse_strategies(raw: &str) -> Result<BTreeMap<String, LoadBalancingStrategy>> {
    let mut strategies = BTreeMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (server_type, strategy) = entry.split_once('=').ok_or_else(|| {
            RouterError::InvalidConfig(format!("expected type=strategy, got: {}", entry))
        })?;

        let server_type = server_type.trim();
        if server_type.is_empty() {
            return Err(RouterError::InvalidConfig(format!(
                "empty server type in: {}",
                entry
            )));
        }

        strategies.insert(server_type.to_string(), strategy.parse::<LoadBalancingStrategy>()?);
    }

    Ok(strategies)
}
