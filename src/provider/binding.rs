//! Memory binding, the host-visible data path, and mapping/flush/invalidate (§4.4 data-path /
//! §4.5 image-size inference).

use log::error;

use crate::atom::AtomId;
use crate::behavior::Behavior;
use crate::error::EngineError;
use crate::memory::MemoryOverlapIndex;
use crate::provider::resolve::{buffer_footprint, image_footprint};
use crate::provider::Ctx;
use crate::registry::ResourceRegistry;

/// `vkBindImageMemory`. The mutator (§4.7) has already recorded `image`'s `bound_memory`/
/// `bind_offset` on the mirror by the time this runs; this creates the authoritative binding in
/// the overlap index and may abort on image-size inference failure (§4.5).
pub fn bind_image_memory(ctx: &mut Ctx, atom_id: AtomId, image: u64, behavior: &mut Behavior) -> Result<(), EngineError> {
    let Some((memory_root, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, image)? else {
        error!("atom {atom_id:?}: vkBindImageMemory on image {image:#x} with no binding recorded on the mirror (benign, skipped)");
        return Ok(());
    };
    let binding = ctx.world.add_binding(memory_root, offset, size);
    behavior.read(ctx.world.handle_of(memory_root));
    let image_key = ctx.world.intern_opaque(image);
    behavior.modify(image_key);
    behavior.write(binding);
    Ok(())
}

/// `vkBindBufferMemory`. Buffer size is fixed at creation time, so unlike images this never
/// aborts.
pub fn bind_buffer_memory(ctx: &mut Ctx, atom_id: AtomId, buffer: u64, behavior: &mut Behavior) {
    let Some((memory_root, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) else {
        error!("atom {atom_id:?}: vkBindBufferMemory on buffer {buffer:#x} with no binding recorded on the mirror (benign, skipped)");
        return;
    };
    let binding = ctx.world.add_binding(memory_root, offset, size);
    behavior.read(ctx.world.handle_of(memory_root));
    let buffer_key = ctx.world.intern_opaque(buffer);
    behavior.modify(buffer_key);
    behavior.write(binding);
}

/// Host-side upload of an image's or buffer's full content (the "data path" atoms), outside of
/// command-buffer recording. Writes every binding currently overlapping the resource's full
/// footprint.
pub fn upload_image_data(ctx: &mut Ctx, atom_id: AtomId, image: u64, behavior: &mut Behavior) -> Result<(), EngineError> {
    let Some((memory_root, offset, size)) = image_footprint(ctx.world, ctx.state, ctx.config, atom_id, image)? else {
        error!("atom {atom_id:?}: data upload to unbound image {image:#x} (benign, skipped)");
        return Ok(());
    };
    for binding in ctx.world.overlapping(memory_root, offset, size) {
        behavior.write(ctx.world.binding_data(binding));
    }
    Ok(())
}

pub fn upload_buffer_data(ctx: &mut Ctx, atom_id: AtomId, buffer: u64, behavior: &mut Behavior) {
    let Some((memory_root, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) else {
        error!("atom {atom_id:?}: data upload to unbound buffer {buffer:#x} (benign, skipped)");
        return;
    };
    for binding in ctx.world.overlapping(memory_root, offset, size) {
        behavior.write(ctx.world.binding_data(binding));
    }
}

/// `vkMapMemory`/`vkUnmapMemory`: host synchronization points with no data-level edge of their
/// own, but the mapping must be kept alive regardless of reachability (the distilled spec's
/// catch-all keep-alive policy extended to these two, since a trimmed-out map/unmap pair would
/// leave a dangling unmap on replay).
pub fn map_or_unmap(ctx: &mut Ctx, atom_id: AtomId, memory: u64, opcode: &str, behavior: &mut Behavior) {
    match ctx.world.lookup_memory(memory) {
        Some(root) => behavior.read(ctx.world.handle_of(root)),
        None => error!("atom {atom_id:?}: {opcode} referenced memory {memory:#x} with no resource-registry entry (benign, skipped)"),
    }
    behavior.mark_keep_alive();
}

/// `vkFlushMappedMemoryRanges`: host writes become visible to the device — a write on every
/// binding overlapping each flushed range.
pub fn flush_mapped_memory_ranges(ctx: &mut Ctx, ranges: &[(u64, u64, u64)], behavior: &mut Behavior) {
    for &(memory, offset, size) in ranges {
        let memory_root = ctx.world.get_or_create_memory(memory);
        for binding in ctx.world.overlapping(memory_root, offset, size) {
            behavior.write(ctx.world.binding_data(binding));
        }
    }
}

/// `vkInvalidateMappedMemoryRanges`: the host refreshes its view from the device — a read on
/// every binding overlapping each invalidated range.
pub fn invalidate_mapped_memory_ranges(ctx: &mut Ctx, ranges: &[(u64, u64, u64)], behavior: &mut Behavior) {
    for &(memory, offset, size) in ranges {
        let memory_root = ctx.world.get_or_create_memory(memory);
        for binding in ctx.world.overlapping(memory_root, offset, size) {
            behavior.read(ctx.world.binding_data(binding));
        }
    }
}
