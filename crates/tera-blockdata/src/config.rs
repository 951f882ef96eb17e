use thiserror::Error;

use crate::policy::CompactionPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse compaction policy RON: {0}")]
    Parse(String),
    #[error("Invalid compaction policy: {0}")]
    Invalid(String),
}

/// Parse and validate a compaction policy from a RON string.
/// Fields left out keep their defaults.
pub fn load_policy_from_str(ron_str: &str) -> Result<CompactionPolicy, ConfigError> {
    let options = ron::Options::default();
    let policy: CompactionPolicy = options
        .from_str(ron_str)
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    policy.validate()?;
    Ok(policy)
}

/// Render a policy as pretty RON, e.g. to seed a config file.
pub fn policy_to_ron(policy: &CompactionPolicy) -> Result<String, ConfigError> {
    ron::ser::to_string_pretty(policy, ron::ser::PrettyConfig::default())
        .map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PromotionTarget;

    #[test]
    fn test_load_full_policy() {
        let policy = load_policy_from_str(
            "(palette_ceiling: 32, uniform_promotion: Dense, require_savings: true)",
        )
        .expect("valid policy");
        assert_eq!(policy.palette_ceiling, 32);
        assert_eq!(policy.uniform_promotion, PromotionTarget::Dense);
        assert!(policy.require_savings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let policy = load_policy_from_str("(palette_ceiling: 8)").expect("valid policy");
        assert_eq!(policy.palette_ceiling, 8);
        assert_eq!(policy.uniform_promotion, PromotionTarget::Paletted);
        assert!(!policy.require_savings);
    }

    #[test]
    fn test_parse_error() {
        let result = load_policy_from_str("(palette_ceiling: \"many\")");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_ceiling_rejected() {
        let result = load_policy_from_str("(palette_ceiling: 1)");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_ron_roundtrip() {
        let policy = CompactionPolicy {
            palette_ceiling: 64,
            uniform_promotion: PromotionTarget::Dense,
            require_savings: true,
        };
        let text = policy_to_ron(&policy).expect("serializes");
        assert_eq!(load_policy_from_str(&text).expect("parses"), policy);
    }
}
