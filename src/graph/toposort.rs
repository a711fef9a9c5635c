//! Kahn-style topological resolver over string-keyed nodes.
//!
//! Each round moves every dependency-free node into the output, then
//! subtracts the round from the remaining nodes' dependency sets. The
//! ready set is sorted by symbol so output order is stable across runs.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// A sortable node: a unique symbol plus the symbols it depends on.
pub trait Node {
    fn symbol(&self) -> String;
    fn deps(&self) -> Vec<String>;
}

#[derive(Debug)]
pub struct Graph<N> {
    pub nodes: Vec<N>,
}

#[derive(Debug, Error)]
#[error("circular dependency:\n{}", render_edges(.edges))]
pub struct CycleError {
    /// The unresolvable subgraph as (node, dependency) pairs.
    pub edges: Vec<(String, String)>,
}

fn render_edges(edges: &[(String, String)]) -> String {
    edges
        .iter()
        .map(|(u, v)| format!("{} -> {}", u, v))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve the graph into dependency order: every node appears after all
/// of its dependencies. Fails when the remaining subgraph has no
/// dependency-free node, i.e. contains a cycle.
pub fn resolve<N: Node>(graph: Graph<N>) -> Result<Vec<N>, CycleError> {
    let mut nodes: HashMap<String, N> = HashMap::new();
    let mut pending: HashMap<String, HashSet<String>> = HashMap::new();

    for node in graph.nodes {
        let symbol = node.symbol();
        pending.insert(symbol.clone(), node.deps().into_iter().collect());
        nodes.insert(symbol, node);
    }

    let mut order = Vec::with_capacity(nodes.len());

    while !pending.is_empty() {
        let mut ready: Vec<String> = pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect();

        if ready.is_empty() {
            let mut edges: Vec<(String, String)> = pending
                .iter()
                .flat_map(|(symbol, deps)| {
                    deps.iter().map(|d| (symbol.clone(), d.clone()))
                })
                .collect();
            edges.sort();
            return Err(CycleError { edges });
        }

        ready.sort();

        for symbol in &ready {
            pending.remove(symbol);
            if let Some(node) = nodes.remove(symbol) {
                order.push(node);
            }
        }

        for deps in pending.values_mut() {
            for symbol in &ready {
                deps.remove(symbol);
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestNode {
        symbol: &'static str,
        deps: Vec<&'static str>,
    }

    impl Node for TestNode {
        fn symbol(&self) -> String {
            self.symbol.to_string()
        }

        fn deps(&self) -> Vec<String> {
            self.deps.iter().map(|s| s.to_string()).collect()
        }
    }

    fn node(symbol: &'static str, deps: &[&'static str]) -> TestNode {
        TestNode {
            symbol,
            deps: deps.to_vec(),
        }
    }

    fn symbols(nodes: &[TestNode]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.symbol).collect()
    }

    #[test]
    fn test_chain_resolves_dependencies_first() {
        let graph = Graph {
            nodes: vec![node("c", &["b"]), node("b", &["a"]), node("a", &[])],
        };
        let order = resolve(graph).unwrap();
        assert_eq!(symbols(&order), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ready_set_is_sorted_for_determinism() {
        let graph = Graph {
            nodes: vec![node("z", &[]), node("a", &[]), node("m", &[])],
        };
        let order = resolve(graph).unwrap();
        assert_eq!(symbols(&order), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_diamond() {
        let graph = Graph {
            nodes: vec![
                node("d", &["b", "c"]),
                node("b", &["a"]),
                node("c", &["a"]),
                node("a", &[]),
            ],
        };
        let order = resolve(graph).unwrap();
        assert_eq!(symbols(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_cycle_is_reported_with_edges() {
        let graph = Graph {
            nodes: vec![node("a", &["b"]), node("b", &["a"]), node("c", &[])],
        };
        let err = resolve(graph).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("circular dependency"), "got {message}");
        assert!(message.contains("a -> b"), "got {message}");
        assert!(message.contains("b -> a"), "got {message}");
        assert!(!message.contains("c ->"), "resolved nodes must not appear: {message}");
    }
}
