//! The per-atom behavior accumulator.
//!
//! A [`Behavior`] is the engine's sole output: an ordered record of the abstract reads, writes
//! and modifies one atom performs, plus the `keep_alive`/`aborted` flags the dependency graph
//! needs to decide reachability. The provider never calls a `DependencyGraph` directly to record
//! an access — it always goes through a `Behavior`, so that an abort can cleanly discard
//! everything accumulated so far (see [`Behavior::abort`]).

use crate::state_key::StateKey;

/// Per-atom record of abstract reads, writes, modifies, plus `keep_alive` and `aborted` flags.
#[derive(Debug, Default, Clone)]
pub struct Behavior {
    reads: Vec<StateKey>,
    writes: Vec<StateKey>,
    modifies: Vec<StateKey>,
    keep_alive: bool,
    aborted: bool,
}

impl Behavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> &[StateKey] {
        &self.reads
    }

    pub fn writes(&self) -> &[StateKey] {
        &self.writes
    }

    pub fn modifies(&self) -> &[StateKey] {
        &self.modifies
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    /// Unconditionally append a read.
    pub fn read(&mut self, key: StateKey) {
        self.reads.push(key);
    }

    /// Unconditionally append a write.
    pub fn write(&mut self, key: StateKey) {
        self.writes.push(key);
    }

    /// Unconditionally append a modify.
    pub fn modify(&mut self, key: StateKey) {
        self.modifies.push(key);
    }

    /// Append a read, coalescing with an immediately preceding read of the same key.
    ///
    /// This is the rule the record-command protocol uses for `cb.handle`: "if the immediately
    /// previous entry of the current atom's Reads is not `cb.handle`, append a read of
    /// `cb.handle`".
    pub fn read_coalesced(&mut self, key: StateKey) {
        if self.reads.last() != Some(&key) {
            self.reads.push(key);
        }
    }

    /// Append a modify, coalescing with an immediately preceding modify of the same key.
    pub fn modify_coalesced(&mut self, key: StateKey) {
        if self.modifies.last() != Some(&key) {
            self.modifies.push(key);
        }
    }

    /// Mark this behavior as forcing graph retention regardless of reachability. Not itself an
    /// error condition.
    pub fn mark_keep_alive(&mut self) {
        self.keep_alive = true;
    }

    /// Discard every accumulated edge and mark the behavior aborted. Per the transaction
    /// discipline, an aborted behavior carries no reads/writes/modifies visible to the graph;
    /// `keep_alive` from before the abort is preserved, since the driver needs "unknown effects"
    /// to be retained regardless of *when* the abort happened to occur within dispatch.
    pub fn abort(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.modifies.clear();
        self.aborted = true;
    }

    /// Flush the accumulated edges into a [`DependencyGraph`](crate::dependency_graph::DependencyGraph).
    /// A no-op on an aborted behavior, matching "abort cleanliness".
    pub fn flush_into(&self, graph: &mut dyn crate::dependency_graph::DependencyGraph) {
        if self.aborted {
            return;
        }
        for &key in &self.reads {
            graph.read(key);
        }
        for &key in &self.writes {
            graph.write(key);
        }
        for &key in &self.modifies {
            graph.modify(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_key::{StateKeyArena, StateKeyKind};

    #[test]
    fn abort_discards_accumulated_edges() {
        let mut arena = StateKeyArena::new();
        let key = arena.push(StateKeyKind::Opaque(1), None);

        let mut behavior = Behavior::new();
        behavior.read(key);
        behavior.write(key);
        behavior.mark_keep_alive();
        behavior.abort();

        assert!(behavior.reads().is_empty());
        assert!(behavior.writes().is_empty());
        assert!(behavior.aborted());
        assert!(behavior.keep_alive());
    }

    #[test]
    fn read_coalesced_only_appends_once() {
        let mut arena = StateKeyArena::new();
        let a = arena.push(StateKeyKind::Opaque(1), None);
        let b = arena.push(StateKeyKind::Opaque(2), None);

        let mut behavior = Behavior::new();
        behavior.read_coalesced(a);
        behavior.read_coalesced(a);
        behavior.read_coalesced(b);
        behavior.read_coalesced(a);

        assert_eq!(behavior.reads(), &[a, b, a]);
    }
}
