//! Owns the state-key arena plus every side table the registry, memory-overlap index and
//! command-buffer record store need. These three components are tightly coupled — they all
//! create and navigate nodes in the same arena — so they share one `WorldModel` rather than
//! fighting the borrow checker over independent arena ownership. Each component's operations
//! live in their own module as a trait implemented for `WorldModel` (see [`crate::registry`],
//! [`crate::memory`], [`crate::command_buffer`]), mirroring how the teacher library splits a
//! command buffer's operations across per-domain trait impl files.

use std::collections::HashMap;

use crate::state_key::{StateKey, StateKeyArena};

/// Metadata kept for a `DeviceMemory` root: its handle child and the bindings created against
/// it, grouped by starting offset as the memory-overlap index requires.
#[derive(Debug, Default)]
pub(crate) struct MemoryMeta {
    pub handle: StateKey,
    pub bindings_by_offset: HashMap<u64, Vec<StateKey>>,
}

/// Metadata kept for a `CommandBuffer` root: its handle child, its `Records` child, and the
/// ordered list of `RecordedCommand` keys currently in that records list.
#[derive(Debug, Default)]
pub(crate) struct CommandBufferMeta {
    pub handle: StateKey,
    pub records: StateKey,
    pub commands: Vec<StateKey>,
}

/// A single deferred operation attached to a `RecordedCommand`. See the design notes: this is
/// the enumerated stand-in for what the original system represents as a closure.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeferredOp {
    Noop,
    ReadKey(StateKey),
    ModifyKey(StateKey),
    ReadOverlap { memory: StateKey, offset: u64, size: u64 },
    ModifyOverlap { memory: StateKey, offset: u64, size: u64 },
    WriteOverlap { memory: StateKey, offset: u64, size: u64 },
}

/// Metadata kept for a `RecordedCommand`: its deferred operations and any secondary command
/// buffers it invokes.
#[derive(Debug, Default)]
pub(crate) struct RecordedCommandMeta {
    pub deferred: Vec<DeferredOp>,
    pub secondaries: Vec<StateKey>,
}

/// The combined state-key lattice, resource registry, memory-overlap index and command-buffer
/// record store. Owned by a single [`crate::provider::BehaviorProvider`]; see §5 for the
/// single-threaded, single-owner concurrency model this assumes.
#[derive(Default)]
pub struct WorldModel {
    pub(crate) arena: StateKeyArena,
    pub(crate) opaque: HashMap<u64, StateKey>,
    pub(crate) memories: HashMap<u64, StateKey>,
    pub(crate) memory_meta: HashMap<StateKey, MemoryMeta>,
    pub(crate) binding_range: HashMap<StateKey, (u64, u64)>,
    pub(crate) binding_data: HashMap<StateKey, StateKey>,
    pub(crate) command_buffers: HashMap<u64, StateKey>,
    pub(crate) command_buffer_meta: HashMap<StateKey, CommandBufferMeta>,
    pub(crate) recorded_meta: HashMap<StateKey, RecordedCommandMeta>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &StateKeyArena {
        &self.arena
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}
