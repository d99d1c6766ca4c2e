//! Object creation, destruction, allocation and binding (§4.4 / §4.4.1).
//!
//! Every opaque Vulkan handle — image, buffer, view, framebuffer, render pass, pipeline, shader
//! module, descriptor set, sampler, queue, event — is a plain `Opaque` state key (§3); only device
//! memory and command buffers get a richer root/handle/children shape. Creation therefore reduces
//! to interning the handle and recording a write; the interesting policy lives in destruction
//! (keep-alive, not deletion) and in the pipeline-layout/sampler read edges §4.4.1 supplements.

use log::error;

use crate::atom::AtomId;
use crate::behavior::Behavior;
use crate::provider::Ctx;
use crate::registry::ResourceRegistry;

/// `vkCreate*`/`vkAllocate{Memory,CommandBuffers}`: intern the handle and record its creation as
/// a write. Command buffers and device memory additionally get their registry-side root/handle
/// structure (§4.1) rather than a plain opaque key.
pub fn create_opaque(ctx: &mut Ctx, handle: u64, behavior: &mut Behavior) {
    let key = ctx.world.intern_opaque(handle);
    behavior.write(key);
}

/// `vkAllocateMemory`/`RecreateDeviceMemory`, per §4.4 "Allocation": writes the new `DeviceMemory`
/// root, then walks the `pNext` chain for a dedicated-allocation node naming a non-null image or
/// buffer and reads that opaque key (benign-missing if the registry has no record of it).
pub fn allocate_memory(ctx: &mut Ctx, atom_id: AtomId, memory: u64, dedicated_allocation: Option<u64>, behavior: &mut Behavior) {
    let root = ctx.world.get_or_create_memory(memory);
    behavior.write(ctx.world.handle_of(root));

    if let Some(handle) = dedicated_allocation {
        match ctx.world.lookup_opaque(handle) {
            Some(key) => behavior.read(key),
            None => error!("atom {atom_id:?}: vkAllocateMemory dedicated-allocation target {handle:#x} has no resource-registry entry (benign, skipped)"),
        }
    }
}

pub fn allocate_command_buffers(ctx: &mut Ctx, command_buffers: &[u64], behavior: &mut Behavior) {
    for &cb in command_buffers {
        let root = ctx.world.get_or_create_command_buffer(cb);
        behavior.write(ctx.world.handle_of(root));
    }
}

/// `vkCreateGraphicsPipelines`/`vkCreateComputePipelines`, supplemented per §4.4.1: a created
/// pipeline also reads its pipeline layout and any immutable samplers that layout's descriptor
/// set layouts embed, so a live pipeline keeps its structural dependencies alive even though no
/// command ever "uses" the layout object directly. Both are benign-missing if the mirror has no
/// record of them yet.
pub fn create_pipelines(
    ctx: &mut Ctx,
    atom_id: AtomId,
    pipelines: &[u64],
    layout: Option<u64>,
    immutable_samplers: &[u64],
    behavior: &mut Behavior,
) {
    for &pipeline in pipelines {
        let key = ctx.world.intern_opaque(pipeline);
        behavior.write(key);
    }
    if let Some(layout) = layout {
        match ctx.world.lookup_opaque(layout) {
            Some(key) => behavior.read(key),
            None => error!("atom {atom_id:?}: pipeline layout {layout:#x} has no resource-registry entry (benign, skipped)"),
        }
    }
    for &sampler in immutable_samplers {
        match ctx.world.lookup_opaque(sampler) {
            Some(key) => behavior.read(key),
            None => error!("atom {atom_id:?}: immutable sampler {sampler:#x} has no resource-registry entry (benign, skipped)"),
        }
    }
}

/// `vkDestroy*`: per §4.1, destruction never removes the registry entry; it marks the object's
/// key keep-alive so the driver's dependency graph never drops a resource whose destruction was
/// itself observed (the trace explicitly interacted with it up to this point). A destroy atom
/// referencing a handle the registry never saw created is benign-missing, not an abort — a real
/// trace cannot destroy what was never created, so this only fires on malformed or partial input.
pub fn destroy_object(ctx: &mut Ctx, atom_id: AtomId, handle: u64, behavior: &mut Behavior) {
    match ctx.world.lookup_opaque(handle) {
        Some(key) => {
            behavior.modify(key);
            behavior.mark_keep_alive();
        }
        None => error!("atom {atom_id:?}: vkDestroy* referenced handle {handle:#x} with no resource-registry entry (benign, skipped)"),
    }
}

pub fn free_memory(ctx: &mut Ctx, atom_id: AtomId, memory: u64, behavior: &mut Behavior) {
    match ctx.world.lookup_memory(memory) {
        Some(root) => {
            behavior.modify(ctx.world.handle_of(root));
            behavior.mark_keep_alive();
        }
        None => error!("atom {atom_id:?}: vkFreeMemory referenced memory {memory:#x} with no resource-registry entry (benign, skipped)"),
    }
}

pub fn free_command_buffers(ctx: &mut Ctx, atom_id: AtomId, command_buffers: &[u64], behavior: &mut Behavior) {
    for &cb in command_buffers {
        match ctx.world.lookup_command_buffer(cb) {
            Some(root) => {
                behavior.modify(ctx.world.handle_of(root));
                behavior.mark_keep_alive();
            }
            None => error!("atom {atom_id:?}: vkFreeCommandBuffers referenced command buffer {cb:#x} with no resource-registry entry (benign, skipped)"),
        }
    }
}
