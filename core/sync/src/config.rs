//! Core configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use firewood_common::{Error, Result};
use firewood_workflow::WorkflowPolicy;

use crate::conflict::DuplicatePolicy;

/// Policy points of the sync and lifecycle core.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub workflow_policy: WorkflowPolicy,
}

impl CoreConfig {
    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load from `path`, or the defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firewood_common::Role;
    use firewood_workflow::ReapprovalPolicy;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = CoreConfig::from_json(
            r#"{ "workflow_policy": { "reapproval": "on_address_change" } }"#,
        )
        .unwrap();
        assert_eq!(config.workflow_policy.reapproval, ReapprovalPolicy::OnAddressChange);
        assert_eq!(config.workflow_policy.reopen_roles, vec![Role::Admin, Role::Lead]);
        assert!(config.duplicate_policy.enabled);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let mut config = CoreConfig::default();
        config.duplicate_policy.strip_punctuation = true;
        let back = CoreConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(CoreConfig::load_or_default(&path), Err(Error::Serialization(_))));
    }
}
