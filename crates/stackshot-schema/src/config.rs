use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Where the stack template comes from, after the loader has resolved local paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSource {
    /// Inline template text. Local template files are read into this variant.
    Body(String),
    /// Template hosted at a URL the orchestration service can fetch.
    Url(String),
}

/// Action the service takes when stack creation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnFailure {
    DoNothing,
    Rollback,
    Delete,
}

impl OnFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            OnFailure::DoNothing => "DO_NOTHING",
            OnFailure::Rollback => "ROLLBACK",
            OnFailure::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnFailure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DO_NOTHING" => Ok(OnFailure::DoNothing),
            "ROLLBACK" => Ok(OnFailure::Rollback),
            "DELETE" => Ok(OnFailure::Delete),
            other => Err(ConfigError::InvalidOnFailure(other.to_owned())),
        }
    }
}

/// Desired state of one stack. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    pub template: TemplateSource,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Create-only.
    #[serde(default)]
    pub enable_termination_protection: bool,
    /// Create-only. Mutually exclusive with `on_failure`.
    #[serde(default)]
    pub disable_rollback: bool,
    /// Create-only. Mutually exclusive with `disable_rollback`.
    #[serde(default)]
    pub on_failure: Option<OnFailure>,
}

impl StackConfig {
    pub fn new(name: impl Into<String>, template: TemplateSource) -> Self {
        Self {
            name: name.into(),
            template,
            parameters: BTreeMap::new(),
            tags: BTreeMap::new(),
            capabilities: Vec::new(),
            enable_termination_protection: false,
            disable_rollback: false,
            on_failure: None,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    /// Check the invariants the document loader enforces, for records built in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_stack_name(&self.name)?;
        if self.disable_rollback && self.on_failure.is_some() {
            return Err(ConfigError::ConflictingFailurePolicy);
        }
        Ok(())
    }
}

pub fn validate_stack_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.len() > 128 {
        return Err(ConfigError::InvalidName(
            "stack name must be 1-128 characters".to_owned(),
        ));
    }
    if !name.as_bytes()[0].is_ascii_alphabetic() {
        return Err(ConfigError::InvalidName(format!(
            "'{name}' must start with a letter"
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(ConfigError::InvalidName(format!(
            "'{name}' must match [A-Za-z][A-Za-z0-9-]*"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_config(name: &str) -> StackConfig {
        StackConfig::new(name, TemplateSource::Url("https://t.example/s3.yaml".to_owned()))
    }

    #[test]
    fn on_failure_parses_wire_names() {
        assert_eq!("DELETE".parse::<OnFailure>().unwrap(), OnFailure::Delete);
        assert_eq!(
            "DO_NOTHING".parse::<OnFailure>().unwrap(),
            OnFailure::DoNothing
        );
        assert!("delete".parse::<OnFailure>().is_err());
    }

    #[test]
    fn on_failure_display_matches_serde() {
        for policy in [OnFailure::DoNothing, OnFailure::Rollback, OnFailure::Delete] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{policy}\""));
        }
    }

    #[test]
    fn valid_names() {
        assert!(validate_stack_name("hellobuckets").is_ok());
        assert!(validate_stack_name("web-tier-2").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_stack_name("").is_err());
        assert!(validate_stack_name("2fast").is_err());
        assert!(validate_stack_name("has_underscore").is_err());
        assert!(validate_stack_name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn validate_rejects_both_failure_settings() {
        let mut config = url_config("web");
        config.disable_rollback = true;
        config.on_failure = Some(OnFailure::Delete);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingFailurePolicy)
        ));
    }

    #[test]
    fn builder_helpers_collect_values() {
        let config = url_config("web")
            .with_parameter("VpcId", "vpc-1")
            .with_tag("team", "alpha")
            .with_capability("CAPABILITY_IAM");
        assert_eq!(config.parameters["VpcId"], "vpc-1");
        assert_eq!(config.tags["team"], "alpha");
        assert_eq!(config.capabilities, vec!["CAPABILITY_IAM"]);
        assert!(config.validate().is_ok());
    }
}
