//! Order engine configuration

use ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use types::ids::AssetName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Counter-currency for every trade; BUY reserves it, SELL is paid in it
    pub cash_asset: AssetName,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cash_asset: AssetName::cash(),
        }
    }
}

impl EngineConfig {
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            cash_asset: self.cash_asset.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cash_asset_is_try() {
        assert_eq!(EngineConfig::default().cash_asset.as_str(), "TRY");
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_blank_cash_asset_is_rejected() {
        assert!(serde_json::from_str::<EngineConfig>(r#"{"cash_asset":"  "}"#).is_err());
    }

    #[test]
    fn test_ledger_config_carries_cash_asset() {
        let config: EngineConfig = serde_json::from_str(r#"{"cash_asset":"USD"}"#).unwrap();
        assert_eq!(config.ledger_config().cash_asset.as_str(), "USD");
    }
}
