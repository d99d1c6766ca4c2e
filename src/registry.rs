//! The resource registry (§4.1): interning maps from Vulkan handle values to their state-key
//! roots, creating entries lazily on first reference.

use crate::state_key::{StateKey, StateKeyKind};
use crate::world::{CommandBufferMeta, MemoryMeta, WorldModel};

/// Lookup/create operations over the [`WorldModel`]'s interning maps.
pub trait ResourceRegistry {
    /// Intern the opaque key for a 64-bit Vulkan handle. Pure function of the value: the same
    /// handle always maps to the same [`StateKey`].
    fn intern_opaque(&mut self, handle: u64) -> StateKey;

    /// Probe whether `handle` has already been interned, without creating an entry.
    fn lookup_opaque(&self, handle: u64) -> Option<StateKey>;

    /// Look up the `DeviceMemory` root for `handle`, creating it (plus its `Handle` child and
    /// empty bindings map) on first reference.
    fn get_or_create_memory(&mut self, handle: u64) -> StateKey;

    fn lookup_memory(&self, handle: u64) -> Option<StateKey>;

    /// Look up the `CommandBuffer` root for `handle`, creating it (plus its `Handle` child and
    /// empty `Records`) on first reference.
    fn get_or_create_command_buffer(&mut self, handle: u64) -> StateKey;

    fn lookup_command_buffer(&self, handle: u64) -> Option<StateKey>;

    /// The `Handle` child of a memory or command-buffer root.
    fn handle_of(&self, root: StateKey) -> StateKey;

    /// The `Records` child of a command-buffer root.
    fn records_of(&self, command_buffer: StateKey) -> StateKey;
}

impl ResourceRegistry for WorldModel {
    fn intern_opaque(&mut self, handle: u64) -> StateKey {
        if let Some(&key) = self.opaque.get(&handle) {
            return key;
        }
        let key = self.arena.push(StateKeyKind::Opaque(handle), None);
        self.opaque.insert(handle, key);
        key
    }

    fn lookup_opaque(&self, handle: u64) -> Option<StateKey> {
        self.opaque.get(&handle).copied()
    }

    fn get_or_create_memory(&mut self, handle: u64) -> StateKey {
        if let Some(&root) = self.memories.get(&handle) {
            return root;
        }
        let root = self.arena.push(StateKeyKind::DeviceMemory, None);
        let handle_key = self.arena.push(StateKeyKind::DeviceMemoryHandle, Some(root));
        self.memories.insert(handle, root);
        self.memory_meta.insert(
            root,
            MemoryMeta {
                handle: handle_key,
                bindings_by_offset: Default::default(),
            },
        );
        root
    }

    fn lookup_memory(&self, handle: u64) -> Option<StateKey> {
        self.memories.get(&handle).copied()
    }

    fn get_or_create_command_buffer(&mut self, handle: u64) -> StateKey {
        if let Some(&root) = self.command_buffers.get(&handle) {
            return root;
        }
        let root = self.arena.push(StateKeyKind::CommandBuffer, None);
        let handle_key = self.arena.push(StateKeyKind::CommandBufferHandle, Some(root));
        let records_key = self.arena.push(StateKeyKind::Records, Some(root));
        self.command_buffers.insert(handle, root);
        self.command_buffer_meta.insert(
            root,
            CommandBufferMeta {
                handle: handle_key,
                records: records_key,
                commands: Vec::new(),
            },
        );
        root
    }

    fn lookup_command_buffer(&self, handle: u64) -> Option<StateKey> {
        self.command_buffers.get(&handle).copied()
    }

    fn handle_of(&self, root: StateKey) -> StateKey {
        if let Some(meta) = self.memory_meta.get(&root) {
            return meta.handle;
        }
        self.command_buffer_meta
            .get(&root)
            .map(|meta| meta.handle)
            .expect("handle_of called on a key that is neither a DeviceMemory nor a CommandBuffer root")
    }

    fn records_of(&self, command_buffer: StateKey) -> StateKey {
        self.command_buffer_meta
            .get(&command_buffer)
            .expect("records_of called on an unknown command buffer root")
            .records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_opaque_is_stable() {
        let mut world = WorldModel::new();
        let k1 = world.intern_opaque(0xdead_beef);
        let k2 = world.intern_opaque(0xdead_beef);
        assert_eq!(k1, k2);
        let k3 = world.intern_opaque(0xcafe_babe);
        assert_ne!(k1, k3);
    }

    #[test]
    fn get_or_create_memory_is_idempotent() {
        let mut world = WorldModel::new();
        let m1 = world.get_or_create_memory(200);
        let m2 = world.get_or_create_memory(200);
        assert_eq!(m1, m2);
        assert!(world.lookup_memory(200).is_some());
        assert!(world.lookup_memory(999).is_none());
    }

    #[test]
    fn get_or_create_command_buffer_creates_handle_and_records() {
        let mut world = WorldModel::new();
        let cb = world.get_or_create_command_buffer(300);
        let handle = world.handle_of(cb);
        let records = world.records_of(cb);
        assert_eq!(world.arena().parent(handle), Some(cb));
        assert_eq!(world.arena().parent(records), Some(cb));
        assert_eq!(world.arena().parent(cb), None);
    }
}
