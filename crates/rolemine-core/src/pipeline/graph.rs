//! Stage dependency graph and topological ordering.
//!
//! Stages are nodes of a directed acyclic graph. An edge `A → B` means "B
//! requires A": A must complete before B may run.
//!
//! Ordering uses Kahn's algorithm. Every wave of ready stages is sorted by
//! name, so the execution order is a pure function of the graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::pipeline::error::{PipelineError, PipelineResult};

/// Directed dependency graph over stage names.
///
/// Cycles are rejected at insertion time via DFS.
#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    /// `dependency → {dependent, ...}`
    downstream: BTreeMap<String, BTreeSet<String>>,
    /// `dependent → {dependency, ...}`
    upstream: BTreeMap<String, BTreeSet<String>>,
}

impl StageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage. Names are unique within a graph.
    pub fn add_stage(&mut self, name: &str) -> PipelineResult<()> {
        if self.contains(name) {
            return Err(PipelineError::DuplicateStage {
                stage: name.to_string(),
            });
        }
        self.downstream.insert(name.to_string(), BTreeSet::new());
        self.upstream.insert(name.to_string(), BTreeSet::new());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.downstream.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.downstream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downstream.is_empty()
    }

    /// Add a directed edge: `dependent` requires `dependency`.
    ///
    /// Returns [`PipelineError::DependencyCycle`] if the edge would close a
    /// cycle; the graph is left unchanged in that case.
    pub fn add_dependency(&mut self, dependency: &str, dependent: &str) -> PipelineResult<()> {
        for name in [dependency, dependent] {
            if !self.contains(name) {
                return Err(PipelineError::StageNotFound {
                    stage: name.to_string(),
                });
            }
        }

        self.downstream
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string());
        self.upstream
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());

        if let Some(cycle) = self.find_cycle_through(dependent) {
            if let Some(set) = self.downstream.get_mut(dependency) {
                set.remove(dependent);
            }
            if let Some(set) = self.upstream.get_mut(dependent) {
                set.remove(dependency);
            }
            return Err(PipelineError::DependencyCycle { stages: cycle });
        }
        Ok(())
    }

    /// Stage names with every dependency before its dependents.
    pub fn topological_order(&self) -> PipelineResult<Vec<String>> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .upstream
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut sorted = Vec::with_capacity(self.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());
            let mut next: Vec<&str> = Vec::new();
            for dep in self.downstream.get(id).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(dep.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        next.push(dep.as_str());
                    }
                }
            }
            next.sort_unstable();
            queue.extend(next);
        }

        if sorted.len() != self.len() {
            let placed: BTreeSet<&String> = sorted.iter().collect();
            return Err(PipelineError::DependencyCycle {
                stages: self
                    .downstream
                    .keys()
                    .filter(|k| !placed.contains(k))
                    .cloned()
                    .collect(),
            });
        }
        Ok(sorted)
    }

    /// Direct dependencies of `name`, sorted.
    pub fn dependencies_of(&self, name: &str) -> PipelineResult<Vec<&str>> {
        self.upstream
            .get(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .ok_or_else(|| PipelineError::StageNotFound {
                stage: name.to_string(),
            })
    }

    /// Every stage that directly or indirectly requires `name`, sorted.
    pub fn transitive_dependents_of(&self, name: &str) -> PipelineResult<Vec<String>> {
        if !self.contains(name) {
            return Err(PipelineError::StageNotFound {
                stage: name.to_string(),
            });
        }

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            for dep in self.downstream.get(&current).into_iter().flatten() {
                if visited.insert(dep.clone()) {
                    queue.push_back(dep.clone());
                }
            }
        }
        Ok(visited.into_iter().collect())
    }

    fn find_cycle_through(&self, start: &str) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();
        let mut path = Vec::new();
        self.dfs_cycle(start, &mut visited, &mut path).then_some(path)
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        if path.iter().any(|p| p == node) {
            path.push(node.to_string());
            return true;
        }
        if !visited.insert(node.to_string()) {
            return false;
        }
        path.push(node.to_string());
        for dep in self.downstream.get(node).into_iter().flatten() {
            if self.dfs_cycle(dep, visited, path) {
                return true;
            }
        }
        path.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(stages: &[&str], edges: &[(&str, &str)]) -> StageGraph {
        let mut g = StageGraph::new();
        for s in stages {
            g.add_stage(s).unwrap();
        }
        for (dep, dependent) in edges {
            g.add_dependency(dep, dependent).unwrap();
        }
        g
    }

    #[test]
    fn test_topological_order_respects_deps() {
        let g = graph(&["usage", "load", "extract"], &[("load", "extract"), ("extract", "usage")]);
        assert_eq!(g.topological_order().unwrap(), vec!["load", "extract", "usage"]);
    }

    #[test]
    fn test_same_wave_stages_are_sorted_by_name() {
        let g = graph(
            &["load", "transitions", "correlation", "usage"],
            &[("load", "usage"), ("load", "transitions"), ("load", "correlation")],
        );
        assert_eq!(
            g.topological_order().unwrap(),
            vec!["load", "correlation", "transitions", "usage"]
        );
    }

    #[test]
    fn test_cycle_detection_rejects_and_rolls_back() {
        let mut g = graph(&["x", "y"], &[("x", "y")]);
        let result = g.add_dependency("y", "x");
        assert!(matches!(result, Err(PipelineError::DependencyCycle { .. })));
        assert_eq!(g.topological_order().unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut g = graph(&["a"], &[]);
        assert!(matches!(
            g.add_dependency("a", "a"),
            Err(PipelineError::DependencyCycle { .. })
        ));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut g = graph(&["a"], &[]);
        assert!(matches!(g.add_stage("a"), Err(PipelineError::DuplicateStage { .. })));
    }

    #[test]
    fn test_stage_not_found_on_missing_node() {
        let mut g = graph(&["a"], &[]);
        assert!(matches!(
            g.add_dependency("a", "missing"),
            Err(PipelineError::StageNotFound { .. })
        ));
    }

    #[test]
    fn test_transitive_dependents_of_diamond() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        assert_eq!(g.transitive_dependents_of("a").unwrap(), vec!["b", "c", "d"]);
        assert!(g.transitive_dependents_of("e").unwrap().is_empty());
        assert_eq!(g.dependencies_of("d").unwrap(), vec!["b", "c"]);
    }
}
