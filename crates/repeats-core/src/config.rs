//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for [`RepeatEngine`](crate::RepeatEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fail with `AmbiguousDirection` instead of falling back to the
    /// proposed orientation when neither Jingle carries a usable date.
    pub strict_direction: bool,
    /// Attempts to lock a neighbourhood that did not change while locking.
    pub lock_retries: u32,
    /// Upper bound on full-graph repair passes.
    pub repair_max_passes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_direction: false,
            lock_retries: 8,
            repair_max_passes: 32,
        }
    }
}

impl EngineConfig {
    /// Validate values that would make the engine unusable.
    pub fn validate(&self) -> crate::RepeatResult<()> {
        if self.lock_retries == 0 {
            return Err(crate::RepeatError::config("lock_retries must be at least 1"));
        }
        if self.repair_max_passes == 0 {
            return Err(crate::RepeatError::config("repair_max_passes must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"strict_direction": true}"#).unwrap();
        assert!(config.strict_direction);
        assert_eq!(config.lock_retries, 8);
        assert_eq!(config.repair_max_passes, 32);
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = EngineConfig {
            lock_retries: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(crate::RepeatError::Config(_))));
        assert!(EngineConfig::default().validate().is_ok());
    }
}
