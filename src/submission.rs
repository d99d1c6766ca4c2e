//! The submission table and execution resolver (§4.6).
//!
//! `executed` entries reference a command either by `[si, cbi, ci]` (a primary command buffer's
//! `ci`-th recorded command) or by `[si, cbi, ci, scbi, sci]` (the `sci`-th recorded command of
//! the `scbi`-th secondary a primary command invoked). The submission table persists the mapping
//! from a submit-like atom to the primary command buffers it dispatched, for the lifetime of the
//! analysis, so these indices stay resolvable no matter how much later the resolver runs.

use std::collections::HashMap;

use log::error;

use crate::atom::AtomId;
use crate::behavior::Behavior;
use crate::command_buffer::CommandRecordStore;
use crate::memory::MemoryOverlapIndex;
use crate::state_key::StateKey;
use crate::world::{DeferredOp, WorldModel};

/// One resolvable subcommand reference, as produced by the (stubbed) mutating interpreter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SubCommandIndex {
    /// `[si, cbi, ci]`: the `ci`-th recorded command of the `cbi`-th command buffer in
    /// `submitInfo[si]`.
    Primary { si: usize, cbi: usize, ci: usize },
    /// `[si, cbi, ci, scbi, sci]`: the `sci`-th recorded command of the `scbi`-th secondary
    /// command buffer invoked by the primary command identified by `[si, cbi, ci]`.
    Secondary {
        si: usize,
        cbi: usize,
        ci: usize,
        scbi: usize,
        sci: usize,
    },
}

/// Maps each submission-like atom to the primary command buffers it dispatched, grouped by
/// `submitInfo` index. Entries are never removed.
#[derive(Default)]
pub struct SubmissionTable {
    entries: HashMap<AtomId, Vec<Vec<StateKey>>>,
}

impl SubmissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the `(submit -> [submitInfo[i].commandBuffers[j]])` structure for `atom`.
    pub fn record(&mut self, atom: AtomId, submit_infos: Vec<Vec<StateKey>>) {
        self.entries.insert(atom, submit_infos);
    }

    pub fn command_buffers_of(&self, atom: AtomId) -> Option<&Vec<Vec<StateKey>>> {
        self.entries.get(&atom)
    }
}

fn apply_deferred_op(world: &WorldModel, op: DeferredOp, behavior: &mut Behavior) {
    match op {
        DeferredOp::Noop => {}
        DeferredOp::ReadKey(key) => behavior.read(key),
        DeferredOp::ModifyKey(key) => behavior.modify(key),
        DeferredOp::ReadOverlap { memory, offset, size } => {
            for binding in world.overlapping(memory, offset, size) {
                behavior.read(world.binding_data(binding));
            }
        }
        DeferredOp::ModifyOverlap { memory, offset, size } => {
            for binding in world.overlapping(memory, offset, size) {
                behavior.modify(world.binding_data(binding));
            }
        }
        DeferredOp::WriteOverlap { memory, offset, size } => {
            for binding in world.overlapping(memory, offset, size) {
                behavior.write(world.binding_data(binding));
            }
        }
    }
}

/// Resolve `recorded` (a `RecordedCommand` key) by firing its deferred operations, in order,
/// against `behavior`. The overlap queries inside each `DeferredOp` are re-run against the
/// *current* memory-overlap index rather than a frozen snapshot, per §4.3.
fn fire(world: &WorldModel, recorded: StateKey, behavior: &mut Behavior) {
    for &op in world.deferred_ops(recorded) {
        apply_deferred_op(world, op, behavior);
    }
}

/// Walk every entry of `executed`, dereference it through `table`, and fire the matching
/// deferred operations into `behavior`. Unresolvable indices (stale data, or a submission the
/// table never recorded) are benign-missing-state: logged and skipped, never an abort.
pub fn resolve_execution(
    world: &WorldModel,
    table: &SubmissionTable,
    submit_atom: AtomId,
    executed: &[SubCommandIndex],
    behavior: &mut Behavior,
) {
    let Some(submit_infos) = table.command_buffers_of(submit_atom) else {
        if !executed.is_empty() {
            error!("execution resolver: no submission recorded for atom {submit_atom:?}");
        }
        return;
    };

    for &index in executed {
        let (si, cbi, ci) = match index {
            SubCommandIndex::Primary { si, cbi, ci } => (si, cbi, ci),
            SubCommandIndex::Secondary { si, cbi, ci, .. } => (si, cbi, ci),
        };

        let Some(cb_root) = submit_infos.get(si).and_then(|cbs| cbs.get(cbi)).copied() else {
            error!("execution resolver: index {index:?} has no matching command buffer in submission table");
            continue;
        };
        if ci >= world.command_count(cb_root) {
            error!("execution resolver: index {index:?} has out-of-range command index");
            continue;
        }
        let primary_rc = world.command_at(cb_root, ci);

        match index {
            SubCommandIndex::Primary { .. } => fire(world, primary_rc, behavior),
            SubCommandIndex::Secondary { scbi, sci, .. } => {
                let secondaries = world.secondaries_of(primary_rc);
                let Some(&secondary_root) = secondaries.get(scbi) else {
                    error!("execution resolver: index {index:?} has no matching secondary command buffer");
                    continue;
                };
                if sci >= world.command_count(secondary_root) {
                    error!("execution resolver: index {index:?} has out-of-range secondary command index");
                    continue;
                }
                let secondary_rc = world.command_at(secondary_root, sci);
                fire(world, secondary_rc, behavior);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_buffer::RecordScratch;
    use crate::registry::ResourceRegistry;

    #[test]
    fn resolves_primary_index_and_fires_deferred_ops() {
        let mut world = WorldModel::new();
        let mut behavior = Behavior::new();
        let mut scratch = RecordScratch::new();
        let target = world.intern_opaque(0xaa);
        world.record_command(300, DeferredOp::ReadKey(target), &mut behavior, &mut scratch);

        let cb = world.get_or_create_command_buffer(300);
        let mut table = SubmissionTable::new();
        let atom = AtomId(1);
        table.record(atom, vec![vec![cb]]);

        let mut submit_behavior = Behavior::new();
        resolve_execution(
            &world,
            &table,
            atom,
            &[SubCommandIndex::Primary { si: 0, cbi: 0, ci: 0 }],
            &mut submit_behavior,
        );
        assert_eq!(submit_behavior.reads(), &[target]);
    }

    #[test]
    fn resolves_secondary_index_through_primary() {
        let mut world = WorldModel::new();
        let mut behavior = Behavior::new();
        let mut scratch = RecordScratch::new();
        let target = world.intern_opaque(0xbb);
        world.record_command(10, DeferredOp::Noop, &mut behavior, &mut scratch); // secondary CB content
        world.record_command(10, DeferredOp::ModifyKey(target), &mut behavior, &mut scratch);
        let secondary_root = world.get_or_create_command_buffer(10);

        let mut scratch2 = RecordScratch::new();
        world.record_secondary(20, secondary_root, &mut behavior, &mut scratch2);
        let primary_root = world.get_or_create_command_buffer(20);

        let mut table = SubmissionTable::new();
        let atom = AtomId(2);
        table.record(atom, vec![vec![primary_root]]);

        let mut submit_behavior = Behavior::new();
        resolve_execution(
            &world,
            &table,
            atom,
            &[SubCommandIndex::Secondary {
                si: 0,
                cbi: 0,
                ci: 0,
                scbi: 0,
                sci: 0,
            }],
            &mut submit_behavior,
        );
        assert_eq!(submit_behavior.modifies(), &[target]);
    }

    #[test]
    fn unresolvable_submission_is_benign() {
        let world = WorldModel::new();
        let table = SubmissionTable::new();
        let mut behavior = Behavior::new();
        resolve_execution(
            &world,
            &table,
            AtomId(999),
            &[SubCommandIndex::Primary { si: 0, cbi: 0, ci: 0 }],
            &mut behavior,
        );
        assert!(behavior.reads().is_empty());
        assert!(!behavior.aborted());
    }
}
