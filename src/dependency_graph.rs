//! The `DependencyGraph` collaborator boundary (§6) plus one concrete, in-crate implementation.
//!
//! The real graph library — the one that performs reachability and drives dead-code elimination
//! — is an external collaborator and out of scope here. [`SimpleDependencyGraph`] is a minimal
//! stand-in backed by `petgraph`, the graph crate this library already depends on for its own
//! task graph, kept around so the engine is testable without a third-party graph store. Embedders
//! with their own graph module should implement [`DependencyGraph`] directly instead.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::state_key::StateKey;

/// An opaque address token the graph library assigns to a state key. The real allocation scheme
/// (e.g. a stable 64-bit content hash) lives in the graph library; this engine only threads the
/// token through for diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StateAddress(pub u64);

/// Kind of access recorded against a graph node. Mirrors [`crate::behavior::Behavior`]'s three
/// categories.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessKind {
    Read,
    Write,
    Modify,
}

/// Operations the behavior provider needs from a dependency graph.
///
/// `read`/`write`/`modify` record an access against `key`'s node (creating it on first mention).
/// `get_state_address_of` returns a stable token for `key`, used only for debug logging of
/// address resolutions (see [`crate::config::EngineConfig::log_address_resolutions`]).
/// `set_root` marks `key` as a reachability root (e.g. the queue presented via
/// `vkQueuePresentKHR`).
pub trait DependencyGraph {
    fn read(&mut self, key: StateKey);
    fn write(&mut self, key: StateKey);
    fn modify(&mut self, key: StateKey);
    fn get_state_address_of(&mut self, key: StateKey) -> StateAddress;
    fn set_root(&mut self, key: StateKey);
    fn is_root(&self, key: StateKey) -> bool;
}

/// Minimal `petgraph`-backed [`DependencyGraph`] implementation.
///
/// Each distinct [`StateKey`] gets one graph node, created lazily on first access. Every access
/// is logged as a self-loop edge labeled with its [`AccessKind`]; no attempt is made to wire
/// edges between the atoms that produced the accesses, since reconstructing the reachability
/// graph over atoms (rather than over state keys) is the out-of-scope graph library's job.
#[derive(Debug, Default)]
pub struct SimpleDependencyGraph {
    graph: DiGraph<StateKey, AccessKind>,
    nodes: HashMap<StateKey, NodeIndex>,
    roots: HashSet<StateKey>,
}

impl SimpleDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_of(&mut self, key: StateKey) -> NodeIndex {
        *self.nodes.entry(key).or_insert_with(|| self.graph.add_node(key))
    }

    fn record_access(&mut self, key: StateKey, kind: AccessKind) {
        let node = self.node_of(key);
        self.graph.add_edge(node, node, kind);
    }

    /// Every access recorded against `key`, in insertion order. Exposed for tests.
    pub fn accesses(&self, key: StateKey) -> Vec<AccessKind> {
        let Some(&node) = self.nodes.get(&key) else {
            return Vec::new();
        };
        self.graph
            .edges(node)
            .map(|edge| *edge.weight())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

impl DependencyGraph for SimpleDependencyGraph {
    fn read(&mut self, key: StateKey) {
        self.record_access(key, AccessKind::Read);
    }

    fn write(&mut self, key: StateKey) {
        self.record_access(key, AccessKind::Write);
    }

    fn modify(&mut self, key: StateKey) {
        self.record_access(key, AccessKind::Modify);
    }

    fn get_state_address_of(&mut self, key: StateKey) -> StateAddress {
        StateAddress(self.node_of(key).index() as u64)
    }

    fn set_root(&mut self, key: StateKey) {
        self.node_of(key);
        self.roots.insert(key);
    }

    fn is_root(&self, key: StateKey) -> bool {
        self.roots.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_key::{StateKeyArena, StateKeyKind};

    #[test]
    fn set_root_is_observable() {
        let mut arena = StateKeyArena::new();
        let queue = arena.push(StateKeyKind::Opaque(7), None);
        let mut graph = SimpleDependencyGraph::new();
        assert!(!graph.is_root(queue));
        graph.set_root(queue);
        assert!(graph.is_root(queue));
    }

    #[test]
    fn accesses_recorded_in_order() {
        let mut arena = StateKeyArena::new();
        let key = arena.push(StateKeyKind::Opaque(1), None);
        let mut graph = SimpleDependencyGraph::new();
        graph.read(key);
        graph.modify(key);
        graph.write(key);
        assert_eq!(graph.accesses(key), vec![AccessKind::Read, AccessKind::Modify, AccessKind::Write]);
    }
}
