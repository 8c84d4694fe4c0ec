//! Canonical stage definitions and run configuration for tests.

use crate::config::{ResourceDef, RoutingRule, RunConfig, StageDefinition, StorageConfig};

fn deps(names: &[&str]) -> Vec<String> {
    names.iter().map(|&n| n.to_string()).collect()
}

/// A minimal stage with no dependencies.
#[must_use]
pub fn default_stage() -> StageDefinition {
    StageDefinition {
        name: "default".to_string(),
        deps: Vec::new(),
        resources: vec![ResourceDef {
            name: "default".to_string(),
            uri: "/default".to_string(),
        }],
        config: vec![RoutingRule {
            files: "*".to_string(),
            resource: "default".to_string(),
        }],
    }
}

/// A stage depending on [`default_stage`].
#[must_use]
pub fn dependent_stage() -> StageDefinition {
    StageDefinition {
        name: "dependent".to_string(),
        deps: deps(&["default"]),
        resources: vec![ResourceDef {
            name: "dependent".to_string(),
            uri: "/dependent".to_string(),
        }],
        config: vec![RoutingRule {
            files: "*".to_string(),
            resource: "dependent".to_string(),
        }],
    }
}

/// A style-check stage with configurable dependencies.
#[must_use]
pub fn style_stage(dependency_names: &[&str]) -> StageDefinition {
    StageDefinition {
        name: "style".to_string(),
        deps: deps(dependency_names),
        resources: vec![ResourceDef {
            name: "linter".to_string(),
            uri: "/linter_v1.1".to_string(),
        }],
        config: vec![RoutingRule {
            files: "*.rs".to_string(),
            resource: "linter".to_string(),
        }],
    }
}

/// A validation stage with configurable dependencies.
#[must_use]
pub fn validate_stage(dependency_names: &[&str]) -> StageDefinition {
    StageDefinition {
        name: "validate".to_string(),
        deps: deps(dependency_names),
        resources: vec![ResourceDef {
            name: "validation".to_string(),
            uri: "/validation_v1.1".to_string(),
        }],
        config: vec![RoutingRule {
            files: "*".to_string(),
            resource: "validation".to_string(),
        }],
    }
}

/// A build stage with configurable dependencies.
#[must_use]
pub fn build_stage(dependency_names: &[&str]) -> StageDefinition {
    StageDefinition {
        name: "build".to_string(),
        deps: deps(dependency_names),
        resources: vec![ResourceDef {
            name: "runner".to_string(),
            uri: "/runner_v1.1".to_string(),
        }],
        config: vec![RoutingRule {
            files: "*".to_string(),
            resource: "runner".to_string(),
        }],
    }
}

/// A generic single-resource stage with the given name and dependencies.
#[must_use]
pub fn named_stage(name: &str, dependency_names: &[&str]) -> StageDefinition {
    StageDefinition {
        name: name.to_string(),
        deps: deps(dependency_names),
        resources: vec![ResourceDef {
            name: name.to_string(),
            uri: format!("/{name}"),
        }],
        config: vec![RoutingRule {
            files: "*".to_string(),
            resource: name.to_string(),
        }],
    }
}

/// A run configuration pointing at local test endpoints.
#[must_use]
pub fn run_config() -> RunConfig {
    RunConfig {
        project_name: "sample_project".to_string(),
        version: "0.0.0".to_string(),
        tracker_url: "http://tracker.local:8089/tasks".to_string(),
        executor_url: "http://executor.local:8000".to_string(),
        storage: StorageConfig {
            url: "http://storage.local:9000".to_string(),
            access_key: "test-access".to_string(),
            secret_key: "test-secret".to_string(),
        },
        analyzers: Vec::new(),
        options: std::collections::HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid_definitions() {
        for definition in [
            default_stage(),
            dependent_stage(),
            style_stage(&["validate"]),
            validate_stage(&[]),
            build_stage(&["validate", "style"]),
            named_stage("extra", &[]),
        ] {
            definition.validate().unwrap();
        }
    }

    #[test]
    fn test_run_config_is_valid() {
        run_config().validate().unwrap();
    }
}
