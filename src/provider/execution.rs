//! Submission, event signaling and presentation (§4.6 execution resolver entry points).

use log::error;

use crate::atom::AtomId;
use crate::behavior::Behavior;
use crate::dependency_graph::DependencyGraph;
use crate::provider::Ctx;
use crate::registry::ResourceRegistry;
use crate::submission::{resolve_execution, SubmissionTable};

/// `vkQueueSubmit`: keep-alive; intern the command buffers into the submission table (keyed by
/// this atom), then resolve every subcommand index the mutator emitted (§4.7) into `behavior`.
pub fn queue_submit(
    ctx: &mut Ctx,
    atom_id: AtomId,
    queue: u64,
    submit_infos: &[Vec<u64>],
    table: &mut SubmissionTable,
    behavior: &mut Behavior,
) {
    let queue_key = ctx.world.intern_opaque(queue);
    behavior.modify(queue_key);
    behavior.mark_keep_alive();

    let keyed: Vec<Vec<_>> = submit_infos
        .iter()
        .map(|cbs| cbs.iter().map(|&cb| ctx.world.get_or_create_command_buffer(cb)).collect())
        .collect();
    table.record(atom_id, keyed);

    let executed = ctx.state.sub_cmd_idx.clone();
    resolve_execution(ctx.world, table, atom_id, &executed, behavior);
}

/// `vkSetEvent`: keep-alive; per §4.7, the mutator re-derives the same subcommand indices as the
/// last submit, resolved here against the submission table entry the last `vkQueueSubmit` atom
/// created.
pub fn set_event(ctx: &mut Ctx, atom_id: AtomId, event: u64, table: &SubmissionTable, behavior: &mut Behavior) {
    let event_key = ctx.world.intern_opaque(event);
    behavior.read(event_key);
    behavior.mark_keep_alive();

    let Some(submit_atom) = ctx.state.current_submission else {
        if !ctx.state.sub_cmd_idx.is_empty() {
            error!("atom {atom_id:?}: vkSetEvent produced subcommand indices with no prior submission recorded (benign, skipped)");
        }
        return;
    };
    let executed = ctx.state.sub_cmd_idx.clone();
    resolve_execution(ctx.world, table, submit_atom, &executed, behavior);
}

/// `vkQueuePresentKHR`: keep-alive; the distilled spec's sole reachability root (§9 open question:
/// not generalized to other present-like entry points). Reads the queue and marks it a graph root.
pub fn queue_present(ctx: &mut Ctx, queue: u64, graph: &mut dyn DependencyGraph, behavior: &mut Behavior) {
    let queue_key = ctx.world.intern_opaque(queue);
    behavior.read(queue_key);
    behavior.mark_keep_alive();
    graph.set_root(queue_key);
}
