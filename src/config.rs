//! Engine settings.
//!
//! Loaded from JSON (the host keeps them alongside its own preferences);
//! every field has a default so an empty object is a valid config.

use serde::{Deserialize, Serialize};

use crate::registry::ChainKind;
use crate::{Error, Result};

/// Where model catalogs come from when bridge mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeMode {
    /// Offer the bridge listing in place of the server catalogs.
    pub enabled: bool,
    /// Include community-contributed models.
    pub community: bool,
    /// Include uncurated models.
    pub uncurated: bool,
}

impl Default for BridgeMode {
    fn default() -> Self {
        Self {
            enabled: true,
            community: true,
            uncurated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bridge_mode: BridgeMode,
    /// LoRA slots filled per node during distribution (1..=8).
    pub chain_capacity_lora: usize,
    /// Push the correction summary to the host after imports and
    /// `configure_node`.
    pub notify_corrections: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bridge_mode: BridgeMode::default(),
            chain_capacity_lora: ChainKind::Lora.capacity(),
            notify_corrections: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config.normalized())
    }

    /// Clamp out-of-range settings.
    pub fn normalized(mut self) -> Self {
        self.chain_capacity_lora = self.chain_capacity_lora.clamp(1, ChainKind::Lora.capacity());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.bridge_mode.enabled);
        assert!(!config.bridge_mode.uncurated);
        assert_eq!(config.chain_capacity_lora, 8);
    }

    #[test]
    fn test_partial_and_clamped() {
        let config = EngineConfig::from_json_str(
            r#"{"bridge_mode":{"uncurated":true},"chain_capacity_lora":40}"#,
        )
        .unwrap();
        assert!(config.bridge_mode.enabled && config.bridge_mode.uncurated);
        assert_eq!(config.chain_capacity_lora, 8);
        let config = EngineConfig::from_json_str(r#"{"chain_capacity_lora":0}"#).unwrap();
        assert_eq!(config.chain_capacity_lora, 1);
    }

    #[test]
    fn test_bad_json_is_config_error() {
        assert!(matches!(EngineConfig::from_json_str("[1,2"), Err(Error::Config(_))));
    }
}
