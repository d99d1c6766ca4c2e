//! Command-buffer lifecycle and `vkCmd*` recording policies (§4.3 / §4.4).
//!
//! Every recording handler goes through [`CommandRecordStore::record_command`], which runs the
//! coalescing protocol (§4.3 steps 1-5) and hands back the `RecordedCommand` key the handler
//! attaches its deferred operations to.

use log::error;

use crate::atom::AtomId;
use crate::behavior::Behavior;
use crate::command_buffer::{CommandRecordStore, RecordScratch};
use crate::error::EngineError;
use crate::provider::resolve::{buffer_footprint, image_footprint};
use crate::provider::Ctx;
use crate::registry::ResourceRegistry;
use crate::world::DeferredOp;

pub fn allocate_command_buffer_noop(_ctx: &mut Ctx) {}

pub fn reset_command_buffer(ctx: &mut Ctx, command_buffer: u64, behavior: &mut Behavior) {
    let cb = ctx.world.get_or_create_command_buffer(command_buffer);
    behavior.modify(ctx.world.records_of(cb));
    ctx.world.reset_records(cb);
}

/// `vkBeginCommandBuffer`: reset-equivalent (§4.3's "Begin" paragraph), not a normal recorded
/// command.
pub fn begin_command_buffer(ctx: &mut Ctx, command_buffer: u64, behavior: &mut Behavior) {
    reset_command_buffer(ctx, command_buffer, behavior);
}

/// `vkEndCommandBuffer` and every `vkCmd*` with no data-level edge: goes through the ordinary
/// record-command protocol with a `Noop` deferred operation, per the distilled spec's "Begin/end
/// CB... have empty deferred closures" bullet.
pub fn cmd_no_data(ctx: &mut Ctx, command_buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    ctx.world.record_command(command_buffer, DeferredOp::Noop, behavior, scratch);
}

/// Copy-class commands with one source and one destination, both images: read the source's
/// current footprint, write the destination's.
pub fn cmd_copy_image_like(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    src_image: u64,
    dst_image: u64,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    if let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, src_image)? {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
    if let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, dst_image)? {
        ctx.world.record_command(command_buffer, DeferredOp::WriteOverlap { memory, offset, size }, behavior, scratch);
    }
    Ok(())
}

pub fn cmd_copy_buffer_like(
    ctx: &mut Ctx,
    command_buffer: u64,
    src_buffer: u64,
    dst_buffer: u64,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) {
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, src_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, dst_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::WriteOverlap { memory, offset, size }, behavior, scratch);
    }
}

pub fn cmd_copy_image_to_buffer(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    src_image: u64,
    dst_buffer: u64,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    if let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, src_image)? {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, dst_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::WriteOverlap { memory, offset, size }, behavior, scratch);
    }
    Ok(())
}

pub fn cmd_copy_buffer_to_image(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    src_buffer: u64,
    dst_image: u64,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, src_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
    if let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, dst_image)? {
        ctx.world.record_command(command_buffer, DeferredOp::WriteOverlap { memory, offset, size }, behavior, scratch);
    }
    Ok(())
}

/// `vkCmdFillBuffer`/`vkCmdUpdateBuffer`: destination-only, modify (not write — these do not
/// necessarily cover the buffer's full footprint, matching the distilled spec's write/modify
/// split between full-footprint copies and partial in-place edits).
pub fn cmd_fill_or_update_buffer(ctx: &mut Ctx, command_buffer: u64, dst_buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, dst_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::ModifyOverlap { memory, offset, size }, behavior, scratch);
    }
}

/// `vkCmdCopyQueryPoolResults`: device-side readback into a buffer, ordinary copy-class policy
/// (§4.4.2) — no tracked source key since query pools are keep-alive-only, so only the
/// destination buffer gets an edge.
pub fn cmd_copy_query_pool_results(ctx: &mut Ctx, command_buffer: u64, dst_buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, dst_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::WriteOverlap { memory, offset, size }, behavior, scratch);
    }
}

/// `vkCmdBindVertexBuffers`/twin: bind time, not draw time, so the deferred closure observes the
/// bound-buffer set before later binds overwrite it. Modifies the buffer's own opaque key and
/// reads each overlapping binding's data.
pub fn cmd_bind_vertex_buffers(ctx: &mut Ctx, command_buffer: u64, buffers: &[u64], behavior: &mut Behavior, scratch: &mut RecordScratch) {
    for &buffer in buffers {
        let buffer_key = ctx.world.intern_opaque(buffer);
        ctx.world.record_command(command_buffer, DeferredOp::ModifyKey(buffer_key), behavior, scratch);
        if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) {
            ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
        }
    }
}

pub fn cmd_bind_index_buffer(ctx: &mut Ctx, command_buffer: u64, buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    let buffer_key = ctx.world.intern_opaque(buffer);
    ctx.world.record_command(command_buffer, DeferredOp::ModifyKey(buffer_key), behavior, scratch);
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
}

/// `vkCmdDraw`/`vkCmdDispatch`: no bound vertex/index/descriptor state of their own to walk here
/// (that is deferred separately by the binds that preceded them in the same command buffer); the
/// draw/dispatch call itself only needs to exist in the records list so later binds' deferred
/// reads are attributed to *a* command, matching the "draw without bind" testable scenario
/// (nothing to read, still coalesces into a `RecordedCommand`).
pub fn cmd_draw_or_dispatch(ctx: &mut Ctx, command_buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    ctx.world.record_command(command_buffer, DeferredOp::Noop, behavior, scratch);
}

/// `vkCmdDrawIndirect`/`vkCmdDrawIndexedIndirect`/`vkCmdDispatchIndirect`: the indirect buffer is
/// read by the device to source the actual draw/dispatch parameters.
pub fn cmd_indirect(ctx: &mut Ctx, command_buffer: u64, indirect_buffer: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, indirect_buffer) {
        ctx.world.record_command(command_buffer, DeferredOp::ReadOverlap { memory, offset, size }, behavior, scratch);
    }
}

/// `vkCmdBeginRenderPass`: the render-pass/framebuffer load/store-op matrix. Per attachment:
/// `loadOp != LOAD && storeOp != DONT_CARE` -> write; `loadOp == LOAD && storeOp != DONT_CARE` ->
/// modify; `loadOp == LOAD && storeOp == DONT_CARE` -> read; `loadOp != LOAD && storeOp ==
/// DONT_CARE` -> no operation.
pub fn cmd_begin_render_pass(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    framebuffer: u64,
    render_pass: u64,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    use ash::vk;

    let Some(fb) = ctx.state.framebuffers.get(&framebuffer).cloned() else {
        error!("atom {atom_id:?}: vkCmdBeginRenderPass referenced framebuffer {framebuffer:#x} with no mirror entry (benign, skipped)");
        return Ok(());
    };
    let Some(rp) = ctx.state.render_passes.get(&render_pass).cloned() else {
        error!("atom {atom_id:?}: vkCmdBeginRenderPass referenced render pass {render_pass:#x} with no mirror entry (benign, skipped)");
        return Ok(());
    };

    for (i, &view) in fb.attachments.iter().enumerate() {
        let Some(ops) = rp.attachments.get(i) else {
            continue;
        };
        let Some(view_mirror) = ctx.state.image_views.get(&view) else {
            continue;
        };
        let image = view_mirror.image;
        let loads = ops.load_op == vk::AttachmentLoadOp::LOAD;
        let stores = ops.store_op != vk::AttachmentStoreOp::DONT_CARE;
        if !loads && !stores {
            continue;
        }
        let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, image)? else {
            continue;
        };
        let op = match (loads, stores) {
            (true, true) => DeferredOp::ModifyOverlap { memory, offset, size },
            (true, false) => DeferredOp::ReadOverlap { memory, offset, size },
            (false, true) => DeferredOp::WriteOverlap { memory, offset, size },
            (false, false) => unreachable!(),
        };
        ctx.world.record_command(command_buffer, op, behavior, scratch);
    }
    Ok(())
}

/// `vkCmdPipelineBarrier`: conservatively defers a single modify per named buffer/image, since a
/// barrier's whole purpose is to order accesses whose exact direction the analysis cannot
/// otherwise distinguish.
pub fn cmd_pipeline_barrier(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    buffers: &[u64],
    images: &[u64],
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    for &buffer in buffers {
        if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) {
            ctx.world.record_command(command_buffer, DeferredOp::ModifyOverlap { memory, offset, size }, behavior, scratch);
        }
    }
    for &image in images {
        if let Some((memory, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, image)? {
            ctx.world.record_command(command_buffer, DeferredOp::ModifyOverlap { memory, offset, size }, behavior, scratch);
        }
    }
    Ok(())
}

/// `vkCmdBindPipeline`/twin: reads the pipeline key immediately (so it is never pruned as long as
/// this atom is kept) and additionally defers a read, to be re-fired when the command executes.
pub fn cmd_bind_pipeline(ctx: &mut Ctx, atom_id: AtomId, command_buffer: u64, pipeline: u64, behavior: &mut Behavior, scratch: &mut RecordScratch) {
    match ctx.world.lookup_opaque(pipeline) {
        Some(key) => {
            behavior.read(key);
            ctx.world.record_command(command_buffer, DeferredOp::ReadKey(key), behavior, scratch);
        }
        None => error!("atom {atom_id:?}: vkCmdBindPipeline referenced pipeline {pipeline:#x} with no resource-registry entry (benign, skipped)"),
    }
}

/// `vkCmdExecuteCommands`: links each secondary's root key into the primary's `RecordedCommand`
/// via [`CommandRecordStore::record_secondary`], which itself reads the secondary (§4.3).
pub fn cmd_execute_commands(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    secondaries: &[u64],
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) {
    for &secondary in secondaries {
        match ctx.world.lookup_command_buffer(secondary) {
            Some(root) => ctx.world.record_secondary(command_buffer, root, behavior, scratch),
            None => error!("atom {atom_id:?}: vkCmdExecuteCommands referenced command buffer {secondary:#x} with no resource-registry entry (benign, skipped)"),
        }
    }
}
