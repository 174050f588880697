use std::collections::{HashMap, HashSet};

/// Records, per class, which other classes its safety is contingent on
///
/// Edges accumulate while proving intrinsic safety (phase 1) and are read-only afterwards.
/// Self-edges carry no information (a class trivially depends on itself) and are never stored.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> DependencyGraph {
        DependencyGraph::default()
    }

    /// Record that `subject`'s safety is contingent on `depends_on`'s
    pub fn record(&mut self, subject: &str, depends_on: &str) {
        if subject == depends_on {
            return;
        }
        self.edges
            .entry(subject.to_owned())
            .or_default()
            .insert(depends_on.to_owned());
    }

    /// The classes `subject` is contingent on, if any were recorded
    pub fn dependencies_of(&self, subject: &str) -> Option<&HashSet<String>> {
        self.edges.get(subject)
    }
}

#[cfg(test)]
mod dependency_graph_tests {
    use super::*;

    #[test]
    fn records_cross_class_edges() {
        let mut graph = DependencyGraph::new();
        graph.record("P/A", "P/B");
        graph.record("P/A", "P/C");
        let deps = graph.dependencies_of("P/A").unwrap();
        assert!(deps.contains("P/B") && deps.contains("P/C"));
    }

    #[test]
    fn never_records_self_edges() {
        let mut graph = DependencyGraph::new();
        graph.record("P/A", "P/A");
        assert!(graph.dependencies_of("P/A").is_none());
    }

    #[test]
    fn deduplicates_edges() {
        let mut graph = DependencyGraph::new();
        graph.record("P/A", "P/B");
        graph.record("P/A", "P/B");
        assert_eq!(graph.dependencies_of("P/A").unwrap().len(), 1);
    }
}
