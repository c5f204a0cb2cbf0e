//! Strategy registry for listing and building strategies by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    ConfluenceConfig, MaCrossoverConfig, MacdMomentumConfig, RsiReversionConfig, Strategy,
    StrategySpec,
};
use daytrade_core::error::StrategyError;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Configuration key
    pub kind: String,
    /// Display name
    pub name: String,
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in strategies.
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };

        registry.register(
            StrategySpec::Confluence(ConfluenceConfig::default()),
            "Confluence",
            "Enters when at least two of EMA/SMA trend, RSI extreme and Bollinger break agree",
        );
        registry.register(
            StrategySpec::MaCrossover(MaCrossoverConfig::default()),
            "MA Crossover",
            "Generates signals on fast SMA / slow EMA crossovers",
        );
        registry.register(
            StrategySpec::RsiReversion(RsiReversionConfig::default()),
            "RSI Reversion",
            "Fades RSI extremes and exits on the mid-line recross",
        );
        registry.register(
            StrategySpec::MacdMomentum(MacdMomentumConfig::default()),
            "MACD Momentum",
            "Follows MACD histogram sign changes",
        );

        registry
    }

    fn register(&mut self, spec: StrategySpec, name: &str, description: &str) {
        let kind = spec.kind().to_string();
        // Drop the tag; it is the map key
        let default_config = match serde_json::to_value(&spec) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("kind");
                serde_json::Value::Object(map)
            }
            _ => serde_json::Value::Null,
        };

        self.strategies.insert(
            kind.clone(),
            StrategyInfo {
                kind,
                name: name.to_string(),
                description: description.to_string(),
                default_config,
            },
        );
    }

    /// List all strategies, ordered by kind.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    pub fn get(&self, kind: &str) -> Option<&StrategyInfo> {
        self.strategies.get(kind)
    }

    pub fn exists(&self, kind: &str) -> bool {
        self.strategies.contains_key(kind)
    }

    pub fn names(&self) -> Vec<&String> {
        self.strategies.keys().collect()
    }

    /// Parse a JSON configuration for `kind` into a spec.
    pub fn spec(&self, kind: &str, config: serde_json::Value) -> Result<StrategySpec, StrategyError> {
        if !self.exists(kind) {
            return Err(StrategyError::NotFound(kind.to_string()));
        }

        let mut map = match config {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(StrategyError::InvalidConfig(format!(
                    "expected an object, got {other}"
                )))
            }
        };
        map.insert("kind".to_string(), serde_json::Value::String(kind.to_string()));

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| StrategyError::InvalidConfig(e.to_string()))
    }

    /// Create a strategy instance from configuration.
    pub fn create(&self, kind: &str, config: serde_json::Value) -> Result<Strategy, StrategyError> {
        self.spec(kind, config)?.build()
    }

    /// Create a strategy with default configuration.
    pub fn create_default(&self, kind: &str) -> Result<Strategy, StrategyError> {
        let info = self
            .get(kind)
            .ok_or_else(|| StrategyError::NotFound(kind.to_string()))?;
        self.create(kind, info.default_config.clone())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daytrade_core::traits::SignalGenerator;

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        let kinds: Vec<_> = registry.list().iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec!["confluence", "ma_crossover", "macd_momentum", "rsi_reversion"]
        );
    }

    #[test]
    fn test_registry_get() {
        let registry = StrategyRegistry::new();
        assert!(registry.get("confluence").is_some());
        assert!(registry.get("unknown").is_none());

        let info = registry.get("rsi_reversion").unwrap();
        assert_eq!(info.default_config["exit_level"], 50.0);
        assert!(info.default_config.get("kind").is_none());
    }

    #[test]
    fn test_create_default() {
        let registry = StrategyRegistry::new();
        for kind in ["confluence", "ma_crossover", "rsi_reversion", "macd_momentum"] {
            assert!(registry.create_default(kind).is_ok(), "{kind}");
        }
        let strategy = registry.create_default("ma_crossover").unwrap();
        assert_eq!(strategy.name(), "MA Crossover");
    }

    #[test]
    fn test_create_with_config() {
        let registry = StrategyRegistry::new();
        let config = serde_json::json!({ "min_conditions": 3 });
        assert!(registry.create("confluence", config).is_ok());

        let bad = serde_json::json!({ "min_conditions": 0 });
        assert!(registry.create("confluence", bad).is_err());
    }

    #[test]
    fn test_create_unknown() {
        let registry = StrategyRegistry::new();
        assert!(matches!(
            registry.create_default("unknown"),
            Err(StrategyError::NotFound(_))
        ));
    }
}
