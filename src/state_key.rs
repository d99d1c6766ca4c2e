//! The state-key lattice: tagged, parent-linked nodes used as dependency-graph vertices.
//!
//! Nodes live in a flat arena and reference each other by index rather than by owning pointer.
//! This sidesteps the mutual `DeviceMemory <-> Handle`, `Binding <-> Data` and
//! `CommandBuffer <-> Records` references a naive ownership model would need.

use std::fmt;

/// Identity of a node in the state-key lattice. Stable for the life of the analysis.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StateKey(u32);

impl StateKey {
    fn from_index(idx: usize) -> Self {
        StateKey(idx.try_into().expect("state-key arena exceeded u32::MAX entries"))
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The tag of a state-key node. See the data model for the full set of invariants each variant
/// carries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StateKeyKind {
    /// A Vulkan handle value with no substructure the analysis cares about.
    Opaque(u64),
    /// Root for an allocated device memory.
    DeviceMemory,
    /// The memory's Vulkan handle token.
    DeviceMemoryHandle,
    /// A sub-range `[start, end)` within a memory. `end == start` denotes an unknown-size
    /// binding.
    DeviceMemoryBinding {
        start: u64,
        end: u64,
    },
    /// Abstract payload of one binding.
    DeviceMemoryData,
    /// Root for a command buffer.
    CommandBuffer,
    /// The command buffer's Vulkan handle token.
    CommandBufferHandle,
    /// Ordered sequence of recorded commands.
    Records,
    /// A single in-record command.
    RecordedCommand,
}

impl StateKeyKind {
    /// True for [`StateKeyKind::DeviceMemoryBinding`] whose `start == end`.
    pub fn is_zero_size_binding(&self) -> bool {
        matches!(self, StateKeyKind::DeviceMemoryBinding { start, end } if start == end)
    }
}

struct Node {
    kind: StateKeyKind,
    parent: Option<StateKey>,
}

/// Flat arena owning every state-key node created during an analysis run.
///
/// This is append-only: nodes are never removed, matching the data model's rule that resources
/// are kept alive for the lifetime of the analysis rather than deleted.
#[derive(Default)]
pub struct StateKeyArena {
    nodes: Vec<Node>,
}

impl StateKeyArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, kind: StateKeyKind, parent: Option<StateKey>) -> StateKey {
        let key = StateKey::from_index(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
        });
        key
    }

    /// Look up the tag of a node.
    pub fn kind(&self, key: StateKey) -> &StateKeyKind {
        &self.nodes[key.index()].kind
    }

    /// Look up the parent of a node, if any.
    pub fn parent(&self, key: StateKey) -> Option<StateKey> {
        self.nodes[key.index()].parent
    }

    /// Walk `parent()` links to the root of `key`'s tree.
    ///
    /// The data model bounds every forest's depth at five steps (`Opaque/DeviceMemory/
    /// CommandBuffer` roots, their `Handle`/`Records` children, and `Records`' own
    /// `RecordedCommand`/`Binding`/`Data` grandchildren are the deepest paths). This is used by
    /// tests to assert parent-acyclicity; production code rarely needs it.
    pub fn root_of(&self, key: StateKey) -> StateKey {
        let mut current = key;
        for _ in 0..8 {
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return current,
            }
        }
        panic!("state-key parent chain from {key} did not terminate within the forest depth bound");
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_of_terminates_for_leaf() {
        let mut arena = StateKeyArena::new();
        let root = arena.push(StateKeyKind::DeviceMemory, None);
        let handle = arena.push(StateKeyKind::DeviceMemoryHandle, Some(root));
        assert_eq!(arena.root_of(handle), root);
        assert_eq!(arena.root_of(root), root);
    }

    #[test]
    fn zero_size_binding_detection() {
        let b = StateKeyKind::DeviceMemoryBinding {
            start: 16,
            end: 16,
        };
        assert!(b.is_zero_size_binding());
        let b = StateKeyKind::DeviceMemoryBinding {
            start: 16,
            end: 32,
        };
        assert!(!b.is_zero_size_binding());
    }
}
