//! Stage definition schema: the external shape of a pipeline stage.

use crate::errors::{OrchestratorError, ValidationError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap_or_else(|_| unreachable!())
    })
}

/// A named remote execution endpoint a stage routes work to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDef {
    /// The resource name, referenced by routing rules.
    pub name: String,
    /// Path of the execution endpoint, relative to the executor base URL.
    ///
    /// May be omitted when an analyzer of the same name supplies it.
    #[serde(default)]
    pub uri: String,
}

/// A routing rule mapping a file glob to a named resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingRule {
    /// Glob over the stage's files; shipped to the executor unchanged.
    pub files: String,
    /// Name of the resource the matched files are routed to.
    pub resource: String,
}

/// The definition of one pipeline stage, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDefinition {
    /// Unique stage name.
    pub name: String,
    /// Names of stages this stage depends on, in declared order.
    #[serde(default)]
    pub deps: Vec<String>,
    /// Remote execution endpoints available to this stage.
    pub resources: Vec<ResourceDef>,
    /// Routing rules from file globs to resources.
    pub config: Vec<RoutingRule>,
}

impl StageDefinition {
    /// Validates the definition's structural shape.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an invalid name, an empty resource
    /// list, a resource without a usable uri, or a routing rule naming an
    /// undeclared resource.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !name_pattern().is_match(&self.name) {
            return Err(ValidationError::new(format!(
                "Invalid stage name '{}'",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        if self.resources.is_empty() {
            return Err(ValidationError::new(format!(
                "Stage '{}' declares no resources",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        for resource in &self.resources {
            if resource.uri.is_empty() {
                return Err(ValidationError::new(format!(
                    "Resource '{}' of stage '{}' has no uri",
                    resource.name, self.name
                ))
                .with_stages(vec![self.name.clone()]));
            }
        }
        for rule in &self.config {
            if !self.resources.iter().any(|r| r.name == rule.resource) {
                return Err(ValidationError::new(format!(
                    "Routing rule for '{}' of stage '{}' names undeclared resource '{}'",
                    rule.files, self.name, rule.resource
                ))
                .with_stages(vec![self.name.clone()]));
            }
        }
        Ok(())
    }

    /// Groups routing rules by the resource they route to, in first-use order.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a rule names an undeclared resource,
    /// or if no rule routes anywhere (a stage with nothing to submit).
    pub fn routed_resources(&self) -> Result<Vec<(&ResourceDef, Vec<&RoutingRule>)>, ValidationError> {
        let mut routed: Vec<(&ResourceDef, Vec<&RoutingRule>)> = Vec::new();
        for rule in &self.config {
            let resource = self
                .resources
                .iter()
                .find(|r| r.name == rule.resource)
                .ok_or_else(|| {
                    ValidationError::new(format!(
                        "Routing rule for '{}' of stage '{}' names undeclared resource '{}'",
                        rule.files, self.name, rule.resource
                    ))
                    .with_stages(vec![self.name.clone()])
                })?;
            match routed.iter_mut().find(|(r, _)| r.name == resource.name) {
                Some((_, rules)) => rules.push(rule),
                None => routed.push((resource, vec![rule])),
            }
        }
        if routed.is_empty() {
            return Err(ValidationError::new(format!(
                "Stage '{}' has no routing configuration",
                self.name
            ))
            .with_stages(vec![self.name.clone()]));
        }
        Ok(routed)
    }
}

/// A set of stage definitions as loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDefinitions {
    /// The stages, in declared order.
    pub stages: Vec<StageDefinition>,
}

impl StageDefinitions {
    /// Parses stage definitions from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or contains unknown keys.
    pub fn from_str(content: &str) -> Result<Self, OrchestratorError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads stage definitions from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(yaml: &str) -> StageDefinition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_parse_stage_definitions() {
        let yaml = r"
stages:
  - name: style
    deps: [validate]
    resources:
      - name: linter
        uri: /linter_v1.1
    config:
      - files: '*.rs'
        resource: linter
";
        let defs = StageDefinitions::from_str(yaml).unwrap();
        assert_eq!(defs.stages.len(), 1);
        assert_eq!(defs.stages[0].name, "style");
        assert_eq!(defs.stages[0].deps, vec!["validate".to_string()]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = r"
stages:
  - name: style
    surprise: true
    resources: []
    config: []
";
        assert!(StageDefinitions::from_str(yaml).is_err());
    }

    #[test]
    fn test_validate_accepts_wellformed() {
        let def = definition(
            r"
name: build
deps: []
resources:
  - name: runner
    uri: /runner_v1.1
config:
  - files: '*'
    resource: runner
",
        );
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let def = definition(
            r"
name: 'bad name'
resources:
  - name: runner
    uri: /runner
config: []
",
        );
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_resources() {
        let def = definition("name: build\nresources: []\nconfig: []\n");
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undeclared_rule_resource() {
        let def = definition(
            r"
name: build
resources:
  - name: runner
    uri: /runner
config:
  - files: '*'
    resource: other
",
        );
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_routed_resources_groups_rules() {
        let def = definition(
            r"
name: build
resources:
  - name: runner
    uri: /runner
  - name: packer
    uri: /packer
config:
  - files: '*.rs'
    resource: runner
  - files: '*.toml'
    resource: runner
  - files: '*'
    resource: packer
",
        );
        let routed = def.routed_resources().unwrap();
        assert_eq!(routed.len(), 2);
        assert_eq!(routed[0].0.name, "runner");
        assert_eq!(routed[0].1.len(), 2);
        assert_eq!(routed[1].0.name, "packer");
    }

    #[test]
    fn test_routed_resources_empty_rules_rejected() {
        let def = definition(
            r"
name: build
resources:
  - name: runner
    uri: /runner
config: []
",
        );
        assert!(def.routed_resources().is_err());
    }
}
