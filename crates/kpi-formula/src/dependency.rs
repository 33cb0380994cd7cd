//! Dependency tracking between formula-defined KPIs

use std::collections::{BTreeMap, BTreeSet};

/// Dependency graph keyed by KPI name
///
/// Tracks which KPIs a formula references (precedents) and which formulas
/// reference a KPI (dependents). Ordered collections keep every traversal
/// deterministic.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Every node, including ones without edges
    nodes: BTreeSet<String>,
    /// KPI → KPIs that depend on it (dependents)
    dependents: BTreeMap<String, BTreeSet<String>>,
    /// KPI → KPIs it depends on (precedents)
    precedents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node without edges
    pub fn add_node(&mut self, name: &str) {
        self.nodes.insert(name.to_string());
    }

    /// Add a dependency: `dependent` depends on `precedent`
    pub fn add_dependency(&mut self, precedent: &str, dependent: &str) {
        self.add_node(precedent);
        self.add_node(dependent);
        self.dependents
            .entry(precedent.to_string())
            .or_default()
            .insert(dependent.to_string());
        self.precedents
            .entry(dependent.to_string())
            .or_default()
            .insert(precedent.to_string());
    }

    /// Remove all dependencies of a node; the node itself stays
    pub fn clear_dependencies(&mut self, name: &str) {
        if let Some(precedents) = self.precedents.remove(name) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(name);
                }
            }
        }

        if let Some(dependents) = self.dependents.remove(name) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(name);
                }
            }
        }
    }

    /// Nodes that depend on `name`
    pub fn dependents<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Nodes that `name` depends on
    pub fn precedents<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.precedents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// All nodes, sorted by name
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Every node ordered so that precedents come before their dependents
    ///
    /// Returns the nodes of one cycle if the graph is not acyclic.
    pub fn evaluation_order(&self) -> Result<Vec<String>, Vec<String>> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut done: BTreeSet<&str> = BTreeSet::new();

        for root in &self.nodes {
            if done.contains(root.as_str()) {
                continue;
            }

            // Depth-first post-order with an explicit stack; the stack is the current path
            let mut on_path: BTreeSet<&str> = BTreeSet::new();
            let mut stack = vec![(root.as_str(), self.precedents(root))];
            on_path.insert(root.as_str());

            while let Some((node, precedents)) = stack.last_mut() {
                match precedents.next() {
                    Some(next) if done.contains(next) => {}
                    Some(next) if on_path.contains(next) => {
                        let start = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        return Err(stack[start..].iter().map(|(n, _)| n.to_string()).collect());
                    }
                    Some(next) => {
                        on_path.insert(next);
                        stack.push((next, self.precedents(next)));
                    }
                    None => {
                        let node = *node;
                        stack.pop();
                        on_path.remove(node);
                        done.insert(node);
                        order.push(node.to_string());
                    }
                }
            }
        }

        Ok(order)
    }

    /// The nodes of one cycle, if any
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        self.evaluation_order().err()
    }
}
