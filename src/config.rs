use serde::{Deserialize, Serialize};

use crate::error::AcsError;

/// Interface configuration knobs consumed by channel selection.
///
/// Selection is requested by leaving `channel` at 0; the engine writes the
/// chosen channel number back on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfaceConfig {
    /// Number of full survey passes over the channel list.
    pub acs_num_req_surveys: u32,
    /// Off-channel dwell per channel, in milliseconds.
    pub acs_roc_duration_ms: u32,
    /// Operating channel. 0 means "pick automatically".
    #[serde(default)]
    pub channel: u8,
}

impl Default for IfaceConfig {
    fn default() -> Self {
        IfaceConfig {
            // Ten passes at 50 ms each keeps the AP off its operating
            // channel for about half a second per candidate, enough to
            // catch bursty traffic without stalling bring-up.
            acs_num_req_surveys: 10,
            acs_roc_duration_ms: 50,
            channel: 0,
        }
    }
}

impl IfaceConfig {
    pub fn validate(&self) -> Result<(), AcsError> {
        if self.acs_num_req_surveys < 1 {
            return Err(AcsError::InvalidConfig);
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let conf = IfaceConfig::default();
        assert_eq!(conf.acs_num_req_surveys, 10);
        assert_eq!(conf.acs_roc_duration_ms, 50);
        assert_eq!(conf.channel, 0);
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let conf = IfaceConfig::default();

        let json = serde_json::to_string_pretty(&conf).expect("serialize failed");
        assert!(json.contains("acs_num_req_surveys"));
        assert!(json.contains("acs_roc_duration_ms"));

        let restored: IfaceConfig = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(restored.acs_num_req_surveys, conf.acs_num_req_surveys);
        assert_eq!(restored.acs_roc_duration_ms, conf.acs_roc_duration_ms);
        assert_eq!(restored.channel, conf.channel);
    }

    #[test]
    fn test_config_custom_values() {
        let json = r#"{
            "acs_num_req_surveys": 2,
            "acs_roc_duration_ms": 100,
            "channel": 0
        }"#;

        let conf: IfaceConfig = serde_json::from_str(json).expect("parse failed");
        assert_eq!(conf.acs_num_req_surveys, 2);
        assert_eq!(conf.acs_roc_duration_ms, 100);
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn test_config_channel_defaults_to_automatic() {
        let json = r#"{
            "acs_num_req_surveys": 1,
            "acs_roc_duration_ms": 50
        }"#;

        let conf: IfaceConfig = serde_json::from_str(json).expect("parse failed");
        assert_eq!(conf.channel, 0);
    }

    #[test]
    fn test_config_rejects_zero_passes() {
        let conf = IfaceConfig {
            acs_num_req_surveys: 0,
            ..IfaceConfig::default()
        };
        assert_eq!(conf.validate(), Err(AcsError::InvalidConfig));
    }
}
