//! Stage dependency graph construction and validation.
//!
//! The graph keeps stages in declared order; execution order is the
//! declared order, with dependency-completion checks enforcing
//! correctness at run time. Validation rejects structural errors,
//! unknown dependency names, and cycles before anything runs.

use crate::config::StageDefinition;
use crate::errors::{
    CircularDependencyError, OrchestratorError, UnknownDependencyError, ValidationError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One stage in a validated graph: its definition plus resolved
/// references to the definitions it depends on.
#[derive(Debug, Clone)]
pub struct StageNode {
    /// The stage definition.
    pub definition: Arc<StageDefinition>,
    /// Indices of dependency stages in the graph's declared order.
    pub deps: Vec<usize>,
}

/// A validated, acyclic stage dependency graph.
///
/// Dependencies are resolved once at build time; each node holds direct
/// indices to its dependency nodes for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct StageGraph {
    nodes: Vec<StageNode>,
    index: HashMap<String, usize>,
}

impl StageGraph {
    /// Builds and validates a graph from a flat list of stage definitions.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a structurally invalid or
    /// duplicate definition, an [`UnknownDependencyError`] for an
    /// unresolvable dependency name, and a [`CircularDependencyError`]
    /// for any direct or indirect cycle.
    pub fn build(definitions: &[StageDefinition]) -> Result<Self, OrchestratorError> {
        if definitions.is_empty() {
            return Err(ValidationError::new("No stages defined").into());
        }

        let mut index = HashMap::new();
        for (position, definition) in definitions.iter().enumerate() {
            definition.validate()?;
            if index.insert(definition.name.clone(), position).is_some() {
                return Err(ValidationError::new(format!(
                    "Duplicate stage name '{}'",
                    definition.name
                ))
                .with_stages(vec![definition.name.clone()])
                .into());
            }
        }

        for definition in definitions {
            for dep in &definition.deps {
                if !index.contains_key(dep) {
                    return Err(UnknownDependencyError::new(&definition.name, dep).into());
                }
            }
        }

        detect_cycles(definitions)?;

        let nodes = definitions
            .iter()
            .map(|definition| StageNode {
                definition: Arc::new(definition.clone()),
                deps: definition.deps.iter().map(|dep| index[dep]).collect(),
            })
            .collect();

        Ok(Self { nodes, index })
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node at the given declared position.
    #[must_use]
    pub fn node(&self, position: usize) -> Option<&StageNode> {
        self.nodes.get(position)
    }

    /// Looks up a stage's declared position by name.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Iterates nodes in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &StageNode> {
        self.nodes.iter()
    }

    /// Returns the resolved dependency definitions of a node.
    #[must_use]
    pub fn dependencies_of(&self, position: usize) -> Vec<Arc<StageDefinition>> {
        self.nodes.get(position).map_or_else(Vec::new, |node| {
            node.deps
                .iter()
                .map(|&dep| Arc::clone(&self.nodes[dep].definition))
                .collect()
        })
    }
}

fn detect_cycles(definitions: &[StageDefinition]) -> Result<(), CircularDependencyError> {
    let deps_of: HashMap<&str, &[String]> = definitions
        .iter()
        .map(|d| (d.name.as_str(), d.deps.as_slice()))
        .collect();

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Walk in declared order so the reported cycle is deterministic.
    for definition in definitions {
        if !visited.contains(definition.name.as_str()) {
            if let Some(cycle) = dfs_cycle(
                &definition.name,
                &deps_of,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Err(CircularDependencyError::new(cycle));
            }
        }
    }

    Ok(())
}

fn dfs_cycle(
    node: &str,
    deps_of: &HashMap<&str, &[String]>,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
) -> Option<Vec<String>> {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    if let Some(deps) = deps_of.get(node) {
        for dep in *deps {
            if rec_stack.contains(dep.as_str()) {
                let start = path.iter().position(|n| n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].to_vec();
                cycle.push(dep.clone());
                return Some(cycle);
            }
            if !visited.contains(dep.as_str()) {
                if let Some(cycle) = dfs_cycle(dep, deps_of, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_resolves_dependencies() {
        let defs = vec![
            fixtures::validate_stage(&[]),
            fixtures::style_stage(&["validate"]),
            fixtures::build_stage(&["validate", "style"]),
        ];

        let graph = StageGraph::build(&defs).unwrap();
        assert_eq!(graph.len(), 3);

        let build_position = graph.position("build").unwrap();
        let deps = graph.dependencies_of(build_position);
        let dep_names: Vec<&str> = deps.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dep_names, vec!["validate", "style"]);
    }

    #[test]
    fn test_declared_order_preserved() {
        let defs = vec![
            fixtures::validate_stage(&[]),
            fixtures::style_stage(&["validate"]),
        ];

        let graph = StageGraph::build(&defs).unwrap();
        let names: Vec<&str> = graph.iter().map(|n| n.definition.name.as_str()).collect();
        assert_eq!(names, vec!["validate", "style"]);
    }

    #[test]
    fn test_empty_definitions_rejected() {
        let err = StageGraph::build(&[]).unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let defs = vec![fixtures::validate_stage(&[]), fixtures::validate_stage(&[])];
        let err = StageGraph::build(&defs).unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let defs = vec![fixtures::style_stage(&["missing"])];
        let err = StageGraph::build(&defs).unwrap_err();
        match err {
            OrchestratorError::UnknownDependency(e) => {
                assert_eq!(e.stage, "style");
                assert_eq!(e.dependency, "missing");
            }
            other => panic!("expected UnknownDependency, got {other}"),
        }
    }

    #[test]
    fn test_self_cycle_rejected() {
        let defs = vec![fixtures::style_stage(&["style"])];
        let err = StageGraph::build(&defs).unwrap_err();
        match err {
            OrchestratorError::CircularDependency(e) => {
                assert_eq!(e.cycle_path, vec!["style".to_string(), "style".to_string()]);
            }
            other => panic!("expected CircularDependency, got {other}"),
        }
    }

    #[test]
    fn test_two_cycle_rejected() {
        let defs = vec![
            fixtures::style_stage(&["validate"]),
            fixtures::validate_stage(&["style"]),
        ];
        let err = StageGraph::build(&defs).unwrap_err();
        match err {
            OrchestratorError::CircularDependency(e) => {
                assert_eq!(e.cycle_path.len(), 3);
                assert_eq!(e.cycle_path.first(), e.cycle_path.last());
            }
            other => panic!("expected CircularDependency, got {other}"),
        }
    }

    #[test]
    fn test_longer_cycle_rejected() {
        let defs = vec![
            fixtures::named_stage("a", &["c"]),
            fixtures::named_stage("b", &["a"]),
            fixtures::named_stage("c", &["b"]),
        ];
        let err = StageGraph::build(&defs).unwrap_err();
        match err {
            OrchestratorError::CircularDependency(e) => {
                assert_eq!(e.cycle_path.len(), 4);
            }
            other => panic!("expected CircularDependency, got {other}"),
        }
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let defs = vec![
            fixtures::named_stage("root", &[]),
            fixtures::named_stage("left", &["root"]),
            fixtures::named_stage("right", &["root"]),
            fixtures::named_stage("join", &["left", "right"]),
        ];
        assert!(StageGraph::build(&defs).is_ok());
    }
}
