//! Scheduler configuration structures.

use serde::{Deserialize, Serialize};

/// Configuration for one scheduler instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Instance name used to attribute log events when a process runs more
    /// than one scheduler.
    pub name: String,
    /// Emit a debug log line for every resource assignment and release.
    pub log_assignments: bool,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            name: "arbiter".to_string(),
            log_assignments: false,
        }
    }
}

impl ArbiterConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = ArbiterConfig::default();
        assert_eq!(cfg.name, "arbiter");
        assert!(!cfg.log_assignments);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_name_is_rejected() {
        let cfg = ArbiterConfig {
            name: "  ".into(),
            log_assignments: false,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: ArbiterConfig =
            serde_json::from_str(r#"{ "log_assignments": true }"#).expect("valid config json");
        assert_eq!(cfg.name, "arbiter");
        assert!(cfg.log_assignments);

        let round_trip = serde_json::to_string(&cfg).expect("serializable");
        let back: ArbiterConfig = serde_json::from_str(&round_trip).expect("round trips");
        assert!(back.log_assignments);
    }
}
