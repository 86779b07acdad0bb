//! Merge behaviour configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::handlers::merge::MergeSettings;
use crate::domain::merge::MergePolicy;

/// Merge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Void reason written on the non-preferred identity.
    /// `{preferred}` and `{non_preferred}` are replaced by the ids.
    #[serde(default = "default_void_reason_template")]
    pub void_reason_template: String,

    /// Ask the search subsystem to reindex both identities after a merge
    #[serde(default = "default_true")]
    pub reindex_on_merge: bool,

    /// Publish `identities.merged.v1` after a merge
    #[serde(default = "default_true")]
    pub publish_events: bool,

    /// How long a merge waits for the identity locks
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
}

impl MergeConfig {
    pub fn policy(&self) -> MergePolicy {
        MergePolicy::new(self.void_reason_template.clone())
    }

    pub fn settings(&self) -> MergeSettings {
        MergeSettings {
            reindex_on_merge: self.reindex_on_merge,
            publish_events: self.publish_events,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Validate merge configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.void_reason_template.trim().is_empty() {
            return Err(ValidationError::BlankVoidReason);
        }
        if self.lock_timeout_secs == 0 || self.lock_timeout_secs > 300 {
            return Err(ValidationError::InvalidLockTimeout);
        }
        Ok(())
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            void_reason_template: default_void_reason_template(),
            reindex_on_merge: true,
            publish_events: true,
            lock_timeout_secs: default_lock_timeout(),
        }
    }
}

fn default_void_reason_template() -> String {
    MergePolicy::DEFAULT_VOID_REASON.to_string()
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::PersonId;
    use crate::domain::merge::MergePair;

    #[test]
    fn test_merge_config_defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.void_reason_template, "Merged with patient #{preferred}");
        assert!(config.reindex_on_merge);
        assert!(config.publish_events);
        assert_eq!(config.settings(), MergeSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_policy_uses_template() {
        let config = MergeConfig {
            void_reason_template: "dup of {preferred}".to_string(),
            ..Default::default()
        };
        let pair = MergePair::new(PersonId::new(), PersonId::new());
        assert_eq!(
            config.policy().void_reason(&pair),
            format!("dup of {}", pair.preferred)
        );
    }

    #[test]
    fn test_validation_rejects_blank_template_and_bad_timeout() {
        let blank = MergeConfig {
            void_reason_template: " ".to_string(),
            ..Default::default()
        };
        assert!(matches!(blank.validate(), Err(ValidationError::BlankVoidReason)));

        let zero = MergeConfig {
            lock_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(ValidationError::InvalidLockTimeout)));
    }
}
