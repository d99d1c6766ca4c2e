//! The memory-overlap index (§4.2): per-device-memory bindings and the overlap query the whole
//! memory-aliasing analysis is built on.

use crate::state_key::{StateKey, StateKeyKind};
use crate::world::WorldModel;

/// Two half-open ranges `[a, b)` and `[c, d)` intersect iff `a < d && c < b`. Strict on
/// zero-size: `[x, x)` never intersects anything, by this rule alone.
fn ranges_intersect(a: u64, b: u64, c: u64, d: u64) -> bool {
    a < d && c < b
}

/// Per-device-memory binding list plus the overlap query.
pub trait MemoryOverlapIndex {
    /// Create a new binding `[offset, offset + size)` with a fresh `Data` child, and append it
    /// under `offset` in `memory`'s bindings map. Never rejects duplicates or overlaps.
    fn add_binding(&mut self, memory: StateKey, offset: u64, size: u64) -> StateKey;

    /// Every existing binding on `memory` whose range intersects `[offset, offset + size)`.
    fn overlapping(&self, memory: StateKey, offset: u64, size: u64) -> Vec<StateKey>;

    /// The `[start, end)` range of a binding.
    fn binding_range(&self, binding: StateKey) -> (u64, u64);

    /// The `Data` child of a binding.
    fn binding_data(&self, binding: StateKey) -> StateKey;
}

impl MemoryOverlapIndex for WorldModel {
    fn add_binding(&mut self, memory: StateKey, offset: u64, size: u64) -> StateKey {
        let end = offset
            .checked_add(size)
            .expect("binding end overflowed u64 — contract violation");
        let binding = self.arena.push(
            StateKeyKind::DeviceMemoryBinding {
                start: offset,
                end,
            },
            Some(memory),
        );
        let data = self.arena.push(StateKeyKind::DeviceMemoryData, Some(binding));

        self.binding_range.insert(binding, (offset, end));
        self.binding_data.insert(binding, data);

        let meta = self
            .memory_meta
            .get_mut(&memory)
            .expect("add_binding called on a key that is not a DeviceMemory root");
        meta.bindings_by_offset.entry(offset).or_default().push(binding);

        binding
    }

    fn overlapping(&self, memory: StateKey, offset: u64, size: u64) -> Vec<StateKey> {
        let Some(meta) = self.memory_meta.get(&memory) else {
            return Vec::new();
        };
        let query_end = offset.saturating_add(size);
        let mut result = Vec::new();
        for bindings in meta.bindings_by_offset.values() {
            for &binding in bindings {
                let (start, end) = self.binding_range[&binding];
                if ranges_intersect(start, end, offset, query_end) {
                    result.push(binding);
                }
            }
        }
        result
    }

    fn binding_range(&self, binding: StateKey) -> (u64, u64) {
        self.binding_range[&binding]
    }

    fn binding_data(&self, binding: StateKey) -> StateKey {
        self.binding_data[&binding]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceRegistry;

    #[test]
    fn add_binding_sets_geometry_and_parent() {
        let mut world = WorldModel::new();
        let memory = world.get_or_create_memory(200);
        let binding = world.add_binding(memory, 16, 48);
        assert_eq!(world.binding_range(binding), (16, 64));
        assert_eq!(world.arena().parent(binding), Some(memory));
        let data = world.binding_data(binding);
        assert_eq!(world.arena().parent(data), Some(binding));
    }

    #[test]
    fn overlap_is_strict_half_open() {
        let mut world = WorldModel::new();
        let memory = world.get_or_create_memory(200);
        let a = world.add_binding(memory, 0, 64); // [0, 64)
        let b = world.add_binding(memory, 64, 64); // [64, 128), touches a at the boundary only

        let hits = world.overlapping(memory, 0, 64);
        assert_eq!(hits, vec![a]);

        let hits = world.overlapping(memory, 32, 64); // [32, 96) overlaps both
        assert!(hits.contains(&a));
        assert!(hits.contains(&b));
    }

    #[test]
    fn zero_size_binding_never_overlaps() {
        let mut world = WorldModel::new();
        let memory = world.get_or_create_memory(200);
        let zero = world.add_binding(memory, 0, 0);
        assert_eq!(world.binding_range(zero), (0, 0));
        let hits = world.overlapping(memory, 0, 64);
        assert!(!hits.contains(&zero));
    }

    #[test]
    fn overlap_does_not_mutate_existing_bindings() {
        let mut world = WorldModel::new();
        let memory = world.get_or_create_memory(200);
        let a = world.add_binding(memory, 0, 64);
        let before = world.binding_range(a);
        let _ = world.overlapping(memory, 0, 1024);
        assert_eq!(world.binding_range(a), before);
    }
}
