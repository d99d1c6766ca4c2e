//! The command-buffer record store and deferred-behavior model (§4.3).
//!
//! The record-command protocol coalesces every `recordCommand` call made while handling a single
//! atom into at most one `RecordedCommand` per target command buffer. [`RecordScratch`] is the
//! per-atom bookkeeping that makes that coalescing possible; the provider creates a fresh one at
//! the start of every `behavior_for` call.

use std::collections::HashMap;

use crate::behavior::Behavior;
use crate::state_key::{StateKey, StateKeyKind};
use crate::world::{DeferredOp, RecordedCommandMeta, WorldModel};

/// Per-atom scratch tracking which `RecordedCommand` (if any) has already been created for each
/// target command buffer during the current atom's dispatch. Reused across every `recordCommand`
/// call the atom's handler makes.
#[derive(Default)]
pub struct RecordScratch {
    current: HashMap<StateKey, StateKey>,
}

impl RecordScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Record-command / reset / secondary-invocation operations over the [`WorldModel`].
pub trait CommandRecordStore {
    /// Run the record-command protocol (§4.3 steps 1-5) for one deferred operation targeting
    /// command buffer `handle`, as part of the atom whose accumulated edges live in `behavior`
    /// and whose per-atom coalescing state lives in `scratch`. Returns the `RecordedCommand`
    /// this operation was appended to (the same key for every call from the same atom against
    /// the same command buffer).
    fn record_command(
        &mut self,
        handle: u64,
        op: DeferredOp,
        behavior: &mut Behavior,
        scratch: &mut RecordScratch,
    ) -> StateKey;

    /// Add `secondary` to the secondaries list of the `RecordedCommand` this atom has already
    /// built for `primary` (creating it via the usual protocol if this is the first
    /// `recordCommand` call for this atom), and read the secondary's root key so it cannot be
    /// dropped. Used for `vkCmdExecuteCommands`.
    fn record_secondary(
        &mut self,
        primary_handle: u64,
        secondary_root: StateKey,
        behavior: &mut Behavior,
        scratch: &mut RecordScratch,
    );

    /// Clear `command_buffer`'s records list, preserving its identity and handle. Used by
    /// CB-reset atoms and by `vkBeginCommandBuffer`.
    fn reset_records(&mut self, command_buffer: StateKey);

    /// Number of `RecordedCommand`s currently in `command_buffer`'s records list.
    fn command_count(&self, command_buffer: StateKey) -> usize;

    /// The `RecordedCommand` at position `index` in `command_buffer`'s records list.
    fn command_at(&self, command_buffer: StateKey, index: usize) -> StateKey;

    /// The deferred operations attached to `recorded`.
    fn deferred_ops(&self, recorded: StateKey) -> &[DeferredOp];

    /// The secondary command buffers `recorded` invokes, in invocation order.
    fn secondaries_of(&self, recorded: StateKey) -> &[StateKey];
}

impl CommandRecordStore for WorldModel {
    fn record_command(
        &mut self,
        handle: u64,
        op: DeferredOp,
        behavior: &mut Behavior,
        scratch: &mut RecordScratch,
    ) -> StateKey {
        use crate::registry::ResourceRegistry;

        let cb = self.get_or_create_command_buffer(handle);
        behavior.read_coalesced(self.handle_of(cb));
        behavior.modify_coalesced(self.records_of(cb));

        let rc = *scratch.current.entry(cb).or_insert_with(|| {
            let records = self.records_of(cb);
            let rc = self.arena.push(StateKeyKind::RecordedCommand, Some(records));
            self.recorded_meta.insert(rc, RecordedCommandMeta::default());
            let meta = self.command_buffer_meta.get_mut(&cb).unwrap();
            if meta.commands.last() != Some(&rc) {
                meta.commands.push(rc);
            }
            rc
        });

        if !matches!(op, DeferredOp::Noop) {
            self.recorded_meta.get_mut(&rc).unwrap().deferred.push(op);
        }

        rc
    }

    fn record_secondary(
        &mut self,
        primary_handle: u64,
        secondary_root: StateKey,
        behavior: &mut Behavior,
        scratch: &mut RecordScratch,
    ) {
        let rc = self.record_command(primary_handle, DeferredOp::Noop, behavior, scratch);
        self.recorded_meta.get_mut(&rc).unwrap().secondaries.push(secondary_root);
        behavior.read(secondary_root);
    }

    fn reset_records(&mut self, command_buffer: StateKey) {
        let meta = self
            .command_buffer_meta
            .get_mut(&command_buffer)
            .expect("reset_records called on an unknown command buffer root");
        meta.commands.clear();
    }

    fn command_count(&self, command_buffer: StateKey) -> usize {
        self.command_buffer_meta[&command_buffer].commands.len()
    }

    fn command_at(&self, command_buffer: StateKey, index: usize) -> StateKey {
        self.command_buffer_meta[&command_buffer].commands[index]
    }

    fn deferred_ops(&self, recorded: StateKey) -> &[DeferredOp] {
        &self.recorded_meta[&recorded].deferred
    }

    fn secondaries_of(&self, recorded: StateKey) -> &[StateKey] {
        &self.recorded_meta[&recorded].secondaries
    }
}
