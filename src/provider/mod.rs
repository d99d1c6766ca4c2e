//! The per-atom behavior provider (§6): `BehaviorProvider::behavior_for` is the crate's sole
//! entry point, dispatching one atom at a time into the handlers below.

mod binding;
mod commands;
mod creation;
mod descriptors;
mod execution;
mod resolve;

use log::{error, warn};

use crate::atom::{Atom, AtomId};
use crate::behavior::Behavior;
use crate::command_buffer::RecordScratch;
use crate::config::EngineConfig;
use crate::dependency_graph::DependencyGraph;
use crate::error::EngineError;
use crate::global_state::GlobalState;
use crate::registry::ResourceRegistry;
use crate::submission::SubmissionTable;
use crate::world::WorldModel;

/// Borrowed handles threaded through every handler: the mutable world model, the (already
/// mutated, now read-only from the dispatcher's perspective) global-state mirror, and the
/// provider's configuration.
pub(crate) struct Ctx<'a> {
    world: &'a mut WorldModel,
    state: &'a GlobalState,
    config: &'a EngineConfig,
}

/// Owns the state-key lattice, the submission table, and the provider's configuration for the
/// lifetime of one analysis run. §5: single-threaded, single-owner — a `BehaviorProvider` is not
/// `Sync` in spirit even though nothing here forces that mechanically (it holds no interior
/// mutability an aliasing caller could exploit, but its API assumes exclusive, in-order calls).
pub struct BehaviorProvider {
    config: EngineConfig,
    world: WorldModel,
    submissions: SubmissionTable,
}

impl BehaviorProvider {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            world: WorldModel::new(),
            submissions: SubmissionTable::new(),
        }
    }

    /// The state-key lattice and every side table built up so far. Exposed for embedders that
    /// want to inspect the registry directly (diagnostics, snapshotting) between atoms.
    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    /// Process one atom: run its mutator against `state` (§4.7), dispatch to the matching
    /// handler, and flush the resulting behavior into `graph`. Returns the [`Behavior`] record
    /// regardless of whether it was aborted, per §6's external interface.
    pub fn behavior_for(
        &mut self,
        atom_id: AtomId,
        atom: &Atom,
        state: &mut GlobalState,
        graph: &mut dyn DependencyGraph,
    ) -> Behavior {
        state.sub_cmd_idx.clear();
        atom.mutate(atom_id, state);

        let mut behavior = Behavior::new();
        let mut scratch = RecordScratch::new();
        let mut ctx = Ctx {
            world: &mut self.world,
            state: &*state,
            config: &self.config,
        };

        let result = dispatch(&mut ctx, atom_id, atom, &mut self.submissions, graph, &mut behavior, &mut scratch);

        if let Err(err) = result {
            if err.is_unknown_opcode() {
                error!("{err} (analysis incomplete for this atom type)");
            } else {
                warn!("atom {atom_id:?} aborted: {err}");
            }
            behavior.abort();
        }

        if self.config.log_address_resolutions {
            log_address_resolutions(graph, &behavior);
        }

        behavior.flush_into(graph);
        behavior
    }
}

fn log_address_resolutions(graph: &mut dyn DependencyGraph, behavior: &Behavior) {
    use log::debug;
    for &key in behavior.reads().iter().chain(behavior.writes().iter()).chain(behavior.modifies().iter()) {
        let address = graph.get_state_address_of(key);
        debug!("resolved {key} to graph address {address:?}");
    }
}

fn dispatch(
    ctx: &mut Ctx,
    atom_id: AtomId,
    atom: &Atom,
    table: &mut SubmissionTable,
    graph: &mut dyn DependencyGraph,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    match atom {
        Atom::CreateImage { image, .. } => creation::create_opaque(ctx, *image, behavior),
        Atom::CreateBuffer { buffer, .. } => creation::create_opaque(ctx, *buffer, behavior),
        Atom::CreateImageView { view, .. } => creation::create_opaque(ctx, *view, behavior),
        Atom::CreateBufferView { view, .. } => creation::create_opaque(ctx, *view, behavior),
        Atom::CreateFramebuffer { framebuffer, .. } => creation::create_opaque(ctx, *framebuffer, behavior),
        Atom::CreateRenderPass { render_pass, .. } => creation::create_opaque(ctx, *render_pass, behavior),
        Atom::CreateShaderModule { module } => creation::create_opaque(ctx, *module, behavior),
        Atom::CreateGraphicsPipelines { pipelines, layout, immutable_samplers, .. }
        | Atom::CreateComputePipelines { pipelines, layout, immutable_samplers, .. } => {
            creation::create_pipelines(ctx, atom_id, pipelines, *layout, immutable_samplers, behavior)
        }

        Atom::DestroyObject { handle } => creation::destroy_object(ctx, atom_id, *handle, behavior),
        Atom::FreeMemory { memory } => creation::free_memory(ctx, atom_id, *memory, behavior),
        Atom::FreeCommandBuffers { command_buffers } => creation::free_command_buffers(ctx, atom_id, command_buffers, behavior),
        Atom::AllocateMemory { memory, dedicated_allocation } => creation::allocate_memory(ctx, atom_id, *memory, *dedicated_allocation, behavior),
        Atom::AllocateCommandBuffers { command_buffers } => creation::allocate_command_buffers(ctx, command_buffers, behavior),

        Atom::BindImageMemory { image, .. } => binding::bind_image_memory(ctx, atom_id, *image, behavior)?,
        Atom::BindBufferMemory { buffer, .. } => binding::bind_buffer_memory(ctx, atom_id, *buffer, behavior),
        Atom::UploadImageData { image } => binding::upload_image_data(ctx, atom_id, *image, behavior)?,
        Atom::UploadBufferData { buffer } => binding::upload_buffer_data(ctx, atom_id, *buffer, behavior),
        Atom::MapMemory { memory } => binding::map_or_unmap(ctx, atom_id, *memory, "vkMapMemory", behavior),
        Atom::UnmapMemory { memory } => binding::map_or_unmap(ctx, atom_id, *memory, "vkUnmapMemory", behavior),
        Atom::FlushMappedMemoryRanges { ranges } => binding::flush_mapped_memory_ranges(ctx, ranges, behavior),
        Atom::InvalidateMappedMemoryRanges { ranges } => binding::invalidate_mapped_memory_ranges(ctx, ranges, behavior),

        Atom::UpdateDescriptorSets { writes, copies } => descriptors::update_descriptor_sets(ctx, atom_id, writes, copies, behavior)?,
        Atom::CmdBindDescriptorSets { command_buffer, sets, recreate } => {
            descriptors::cmd_bind_descriptor_sets(ctx, atom_id, *command_buffer, sets, *recreate, behavior, scratch)?
        }

        Atom::ResetCommandBuffer { command_buffer } => commands::reset_command_buffer(ctx, *command_buffer, behavior),
        Atom::BeginCommandBuffer { command_buffer } => commands::begin_command_buffer(ctx, *command_buffer, behavior),
        Atom::EndCommandBuffer { command_buffer } | Atom::CmdNoData { command_buffer, .. } => {
            commands::cmd_no_data(ctx, *command_buffer, behavior, scratch)
        }
        Atom::CmdCopyImage { command_buffer, src_image, dst_image, .. }
        | Atom::CmdBlitImage { command_buffer, src_image, dst_image, .. }
        | Atom::CmdResolveImage { command_buffer, src_image, dst_image, .. } => {
            commands::cmd_copy_image_like(ctx, atom_id, *command_buffer, *src_image, *dst_image, behavior, scratch)?
        }
        Atom::CmdCopyBuffer { command_buffer, src_buffer, dst_buffer, .. } => {
            commands::cmd_copy_buffer_like(ctx, *command_buffer, *src_buffer, *dst_buffer, behavior, scratch)
        }
        Atom::CmdCopyImageToBuffer { command_buffer, src_image, dst_buffer, .. } => {
            commands::cmd_copy_image_to_buffer(ctx, atom_id, *command_buffer, *src_image, *dst_buffer, behavior, scratch)?
        }
        Atom::CmdCopyBufferToImage { command_buffer, src_buffer, dst_image, .. } => {
            commands::cmd_copy_buffer_to_image(ctx, atom_id, *command_buffer, *src_buffer, *dst_image, behavior, scratch)?
        }
        Atom::CmdFillBuffer { command_buffer, dst_buffer } | Atom::CmdUpdateBuffer { command_buffer, dst_buffer } => {
            commands::cmd_fill_or_update_buffer(ctx, *command_buffer, *dst_buffer, behavior, scratch)
        }
        Atom::CmdCopyQueryPoolResults { command_buffer, dst_buffer } => {
            commands::cmd_copy_query_pool_results(ctx, *command_buffer, *dst_buffer, behavior, scratch)
        }
        Atom::CmdBindVertexBuffers { command_buffer, buffers } => commands::cmd_bind_vertex_buffers(ctx, *command_buffer, buffers, behavior, scratch),
        Atom::CmdBindIndexBuffer { command_buffer, buffer } => commands::cmd_bind_index_buffer(ctx, *command_buffer, *buffer, behavior, scratch),
        Atom::CmdDraw { command_buffer, .. } | Atom::CmdDispatch { command_buffer, .. } => {
            commands::cmd_draw_or_dispatch(ctx, *command_buffer, behavior, scratch)
        }
        Atom::CmdDrawIndirect { command_buffer, indirect_buffer, .. } | Atom::CmdDispatchIndirect { command_buffer, indirect_buffer } => {
            commands::cmd_indirect(ctx, *command_buffer, *indirect_buffer, behavior, scratch)
        }
        Atom::CmdBeginRenderPass { command_buffer, framebuffer, render_pass, .. } => {
            commands::cmd_begin_render_pass(ctx, atom_id, *command_buffer, *framebuffer, *render_pass, behavior, scratch)?
        }
        Atom::CmdPipelineBarrier { command_buffer, buffers, images } => {
            commands::cmd_pipeline_barrier(ctx, atom_id, *command_buffer, buffers, images, behavior, scratch)?
        }
        Atom::CmdBindPipeline { command_buffer, pipeline } => commands::cmd_bind_pipeline(ctx, atom_id, *command_buffer, *pipeline, behavior, scratch),
        Atom::CmdExecuteCommands { command_buffer, secondaries } => {
            commands::cmd_execute_commands(ctx, atom_id, *command_buffer, secondaries, behavior, scratch)
        }

        Atom::QueueSubmit { queue, submit_infos } => execution::queue_submit(ctx, atom_id, *queue, submit_infos, table, behavior),
        Atom::SetEvent { event } => execution::set_event(ctx, atom_id, *event, table, behavior),
        Atom::QueuePresentKHR { queue } => execution::queue_present(ctx, *queue, graph, behavior),

        Atom::LifecycleNoop { handle, .. } => {
            let key = ctx.world.intern_opaque(*handle);
            behavior.read(key);
            behavior.mark_keep_alive();
        }
        Atom::Unknown { opcode } => return Err(EngineError::UnknownOpcode(atom_id, opcode.clone())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency_graph::SimpleDependencyGraph;

    #[test]
    fn create_buffer_writes_its_key() {
        let mut provider = BehaviorProvider::new(EngineConfig::default());
        let mut state = GlobalState::new();
        let mut graph = SimpleDependencyGraph::new();

        let behavior = provider.behavior_for(
            AtomId(0),
            &Atom::CreateBuffer { buffer: 1, size: 256, recreate: false },
            &mut state,
            &mut graph,
        );
        assert_eq!(behavior.writes().len(), 1);
        assert!(!behavior.aborted());
    }

    #[test]
    fn destroy_unknown_handle_is_benign_not_abort() {
        let mut provider = BehaviorProvider::new(EngineConfig::default());
        let mut state = GlobalState::new();
        let mut graph = SimpleDependencyGraph::new();

        let behavior = provider.behavior_for(AtomId(0), &Atom::DestroyObject { handle: 0xdead }, &mut state, &mut graph);
        assert!(!behavior.aborted());
        assert!(behavior.writes().is_empty());
    }

    #[test]
    fn unknown_opcode_aborts() {
        let mut provider = BehaviorProvider::new(EngineConfig::default());
        let mut state = GlobalState::new();
        let mut graph = SimpleDependencyGraph::new();

        let behavior = provider.behavior_for(
            AtomId(0),
            &Atom::Unknown { opcode: "vkDoesNotExist".to_string() },
            &mut state,
            &mut graph,
        );
        assert!(behavior.aborted());
    }

    #[test]
    fn image_size_inference_failure_aborts_bind() {
        let mut provider = BehaviorProvider::new(EngineConfig::default());
        let mut state = GlobalState::new();
        let mut graph = SimpleDependencyGraph::new();

        provider.behavior_for(
            AtomId(0),
            &Atom::CreateImage { image: 1, is_swapchain_image: false, recreate: false },
            &mut state,
            &mut graph,
        );
        provider.behavior_for(AtomId(1), &Atom::AllocateMemory { memory: 10, dedicated_allocation: None }, &mut state, &mut graph);
        // No inferred_size was ever populated on the image mirror, and it is not swapchain-owned,
        // so binding it must abort per §4.5.
        let behavior = provider.behavior_for(
            AtomId(2),
            &Atom::BindImageMemory { image: 1, memory: 10, offset: 0 },
            &mut state,
            &mut graph,
        );
        assert!(behavior.aborted());
    }

    #[test]
    fn draw_bind_submit_present_flows_end_to_end() {
        let mut provider = BehaviorProvider::new(EngineConfig::default());
        let mut state = GlobalState::new();
        let mut graph = SimpleDependencyGraph::new();

        provider.behavior_for(
            AtomId(0),
            &Atom::CreateBuffer { buffer: 1, size: 64, recreate: false },
            &mut state,
            &mut graph,
        );
        provider.behavior_for(AtomId(1), &Atom::AllocateMemory { memory: 10, dedicated_allocation: None }, &mut state, &mut graph);
        provider.behavior_for(
            AtomId(2),
            &Atom::BindBufferMemory { buffer: 1, memory: 10, offset: 0 },
            &mut state,
            &mut graph,
        );
        provider.behavior_for(
            AtomId(3),
            &Atom::AllocateCommandBuffers { command_buffers: vec![100] },
            &mut state,
            &mut graph,
        );
        provider.behavior_for(AtomId(4), &Atom::BeginCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);
        provider.behavior_for(
            AtomId(5),
            &Atom::CmdBindIndexBuffer { command_buffer: 100, buffer: 1 },
            &mut state,
            &mut graph,
        );
        provider.behavior_for(AtomId(6), &Atom::EndCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);

        let submit = provider.behavior_for(
            AtomId(7),
            &Atom::QueueSubmit { queue: 5, submit_infos: vec![vec![100]] },
            &mut state,
            &mut graph,
        );
        // The index-buffer bind deferred a read on the buffer's binding, fired at submit time.
        assert!(!submit.reads().is_empty());

        let present = provider.behavior_for(AtomId(8), &Atom::QueuePresentKHR { queue: 5 }, &mut state, &mut graph);
        assert!(!present.aborted());
        let queue_key = provider.world().arena().len(); // sanity: arena grew past zero
        assert!(queue_key > 0);
    }
}
