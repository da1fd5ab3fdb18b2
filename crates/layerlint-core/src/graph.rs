use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::types::Module;

/// Node in the dependency graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub path: String,
    pub layer: Option<String>,
}

/// Edge in the dependency graph: the first import that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub import: String,
}

/// Every module an import string was resolved to.
///
/// Resolution is a relation, not a function: an import may match several
/// modules, and all of them become dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResolution {
    pub module: String,
    pub import: String,
    pub candidates: Vec<String>,
}

impl ImportResolution {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Directed module dependency graph.
///
/// Only contains modules of the analysed set, has no self-edges and at most
/// one edge per ordered pair.
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    resolutions: Vec<ImportResolution>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            resolutions: Vec::new(),
        }
    }

    /// Resolve every module's imports against the other modules.
    ///
    /// A candidate's dotted name (`app/domain/user.py` → `app.domain.user`)
    /// matches an import when the import is a substring of it or it ends with
    /// the import. Unresolved imports add nothing.
    pub fn build(modules: &[Module]) -> Self {
        let mut graph = Self::new();
        for module in modules {
            graph.add_module(module);
        }

        let dotted: Vec<(&str, String)> = modules
            .iter()
            .map(|m| (m.path.as_str(), m.dotted_name()))
            .collect();

        for module in modules {
            for import in &module.imports {
                if import.is_empty() {
                    continue;
                }
                let candidates: Vec<String> = dotted
                    .iter()
                    .filter(|(path, _)| *path != module.path)
                    .filter(|(_, name)| name.contains(import.as_str()) || name.ends_with(import.as_str()))
                    .map(|(path, _)| path.to_string())
                    .collect();

                if candidates.is_empty() {
                    continue;
                }
                if candidates.len() > 1 {
                    tracing::debug!(
                        module = %module.path,
                        import = %import,
                        candidates = candidates.len(),
                        "Ambiguous import resolution"
                    );
                }

                for candidate in &candidates {
                    graph.add_dependency(&module.path, candidate, import);
                }
                graph.resolutions.push(ImportResolution {
                    module: module.path.clone(),
                    import: import.clone(),
                    candidates,
                });
            }
        }

        graph
    }

    /// Add a module as a node. Returns the node index.
    pub fn add_module(&mut self, module: &Module) -> NodeIndex {
        if let Some(&idx) = self.index.get(&module.path) {
            return idx;
        }
        let idx = self.graph.add_node(GraphNode {
            path: module.path.clone(),
            layer: module.layer.clone(),
        });
        self.index.insert(module.path.clone(), idx);
        idx
    }

    /// Add an edge between two known modules. Self-edges, unknown endpoints
    /// and repeated pairs are ignored. Returns whether an edge was added.
    pub fn add_dependency(&mut self, from: &str, to: &str, import: &str) -> bool {
        if from == to {
            return false;
        }
        let (Some(&from_idx), Some(&to_idx)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if self.graph.contains_edge(from_idx, to_idx) {
            return false;
        }
        self.graph.add_edge(
            from_idx,
            to_idx,
            GraphEdge {
                import: import.to_string(),
            },
        );
        true
    }

    /// Modules `path` depends on, sorted.
    pub fn dependencies(&self, path: &str) -> BTreeSet<&str> {
        let Some(&idx) = self.index.get(path) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n].path.as_str())
            .collect()
    }

    /// Modules that depend on `path`, sorted.
    pub fn dependents(&self, path: &str) -> BTreeSet<&str> {
        let Some(&idx) = self.index.get(path) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].path.as_str())
            .collect()
    }

    /// Strongly connected components with more than one member.
    ///
    /// Each component is sorted, and the list is sorted by first member, so
    /// the result does not depend on insertion order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut members: Vec<String> =
                    scc.iter().map(|&idx| self.graph[idx].path.clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Modules nobody depends on, sorted.
    pub fn roots(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].path.as_str())
            .collect();
        roots.sort_unstable();
        roots
    }

    pub fn node(&self, path: &str) -> Option<&GraphNode> {
        self.index.get(path).map(|&idx| &self.graph[idx])
    }

    /// Imports that resolved to more than one module.
    pub fn ambiguous_imports(&self) -> Vec<&ImportResolution> {
        self.resolutions.iter().filter(|r| r.is_ambiguous()).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get all nodes
    pub fn nodes(&self) -> Vec<&GraphNode> {
        self.graph.node_weights().collect()
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str, imports: &[&str]) -> Module {
        let mut m = Module::new(path);
        m.imports = imports.iter().map(|s| s.to_string()).collect();
        m
    }

    #[test]
    fn test_resolves_by_suffix_and_substring() {
        let modules = vec![
            module("app/services/orders.py", &["app.domain.order", "domain.user"]),
            module("app/domain/order.py", &[]),
            module("app/domain/user.py", &[]),
        ];
        let graph = DependencyGraph::build(&modules);

        let deps = graph.dependencies("app/services/orders.py");
        assert_eq!(
            deps.into_iter().collect::<Vec<_>>(),
            vec!["app/domain/order.py", "app/domain/user.py"]
        );
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_unresolved_import_adds_nothing() {
        let modules = vec![module("app/a.py", &["requests", "os.path"]), module("app/b.py", &[])];
        let graph = DependencyGraph::build(&modules);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.resolutions.is_empty());
        assert_eq!(graph.graph.node_count(), 2);
    }

    #[test]
    fn test_never_resolves_to_self() {
        let modules = vec![module("app/util.py", &["app.util", "util"])];
        let graph = DependencyGraph::build(&modules);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.dependencies("app/util.py").is_empty());
    }

    #[test]
    fn test_ambiguous_import_records_all_candidates() {
        let modules = vec![
            module("app/main.py", &["models"]),
            module("app/orders/models.py", &[]),
            module("app/users/models.py", &[]),
        ];
        let graph = DependencyGraph::build(&modules);

        assert_eq!(graph.dependencies("app/main.py").len(), 2);
        let ambiguous = graph.ambiguous_imports();
        assert_eq!(ambiguous.len(), 1);
        assert_eq!(ambiguous[0].import, "models");
        assert_eq!(
            ambiguous[0].candidates,
            vec!["app/orders/models.py", "app/users/models.py"]
        );
    }

    #[test]
    fn test_parallel_resolutions_collapse_to_one_edge() {
        let modules = vec![
            module("app/a.py", &["app.b", "b", "app.b"]),
            module("app/b.py", &[]),
        ];
        let graph = DependencyGraph::build(&modules);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.resolutions.len(), 3);
        let imports: Vec<_> = graph.graph.edge_weights().map(|e| e.import.as_str()).collect();
        assert_eq!(imports, vec!["app.b"]);
    }

    #[test]
    fn test_add_dependency_guards() {
        let mut graph = DependencyGraph::new();
        graph.add_module(&module("a.py", &[]));
        graph.add_module(&module("b.py", &[]));
        assert!(graph.add_dependency("a.py", "b.py", "b"));
        assert!(!graph.add_dependency("a.py", "b.py", "b"));
        assert!(!graph.add_dependency("a.py", "a.py", "a"));
        assert!(!graph.add_dependency("a.py", "zzz.py", "zzz"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_no_duplicate_nodes() {
        let mut graph = DependencyGraph::new();
        let m = module("a.py", &[]);
        graph.add_module(&m);
        graph.add_module(&m);
        assert_eq!(graph.graph.node_count(), 1);
    }

    #[test]
    fn test_cycles_three_modules_one_component() {
        let mut graph = DependencyGraph::new();
        for p in ["a.py", "b.py", "c.py", "d.py"] {
            graph.add_module(&module(p, &[]));
        }
        graph.add_dependency("a.py", "b.py", "b");
        graph.add_dependency("b.py", "c.py", "c");
        graph.add_dependency("c.py", "a.py", "a");
        graph.add_dependency("c.py", "d.py", "d");

        let cycles = graph.cycles();
        assert_eq!(cycles, vec![vec!["a.py", "b.py", "c.py"]]);
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut graph = DependencyGraph::new();
        for p in ["a.py", "b.py", "c.py"] {
            graph.add_module(&module(p, &[]));
        }
        graph.add_dependency("a.py", "b.py", "b");
        graph.add_dependency("b.py", "c.py", "c");
        graph.add_dependency("a.py", "c.py", "c");
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_roots_and_dependents() {
        let mut graph = DependencyGraph::new();
        for p in ["a.py", "b.py", "c.py"] {
            graph.add_module(&module(p, &[]));
        }
        graph.add_dependency("a.py", "c.py", "c");
        graph.add_dependency("b.py", "c.py", "c");
        assert_eq!(graph.roots(), vec!["a.py", "b.py"]);
        assert_eq!(
            graph.dependents("c.py").into_iter().collect::<Vec<_>>(),
            vec!["a.py", "b.py"]
        );
    }
}
