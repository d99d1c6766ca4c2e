//! Descriptor-set updates and bind (§4.4), including the descriptor-indirect memory read path
//! and the `vkCmdBindDescriptorSets` `Recreate`-twin open question (§9).

use log::error;

use crate::atom::{descriptor_binding_mirror_of, AtomId, DescriptorCopy, DescriptorWrite};
use crate::behavior::Behavior;
use crate::command_buffer::{CommandRecordStore, RecordScratch};
use crate::error::EngineError;
use crate::global_state::DescriptorBindingMirror;
use crate::provider::resolve::{buffer_footprint, image_footprint};
use crate::provider::Ctx;
use crate::registry::ResourceRegistry;
use crate::world::DeferredOp;

/// `vkUpdateDescriptorSets`. The mirror (`DescriptorBindingMirror`) was already updated by the
/// atom's mutator; this records the structural read edges onto whatever each binding now points
/// at, the same "a reference is a read" convention §4.4.1 uses for pipeline layouts. Per §4.4, a
/// write naming a descriptor type this engine does not model aborts the atom's behavior.
pub fn update_descriptor_sets(
    ctx: &mut Ctx,
    atom_id: AtomId,
    writes: &[DescriptorWrite],
    copies: &[DescriptorCopy],
    behavior: &mut Behavior,
) -> Result<(), EngineError> {
    for write in writes {
        if descriptor_binding_mirror_of(write).is_none() {
            return Err(EngineError::UnhandledDescriptorType(atom_id, write.descriptor_type));
        }
        let set_key = ctx.world.intern_opaque(write.set);
        behavior.modify(set_key);
        for &(sampler, view) in &write.image_infos {
            if sampler != 0 {
                behavior.read(ctx.world.intern_opaque(sampler));
            }
            if view != 0 {
                behavior.read(ctx.world.intern_opaque(view));
            }
        }
        for &buffer in &write.buffer_infos {
            behavior.read(ctx.world.intern_opaque(buffer));
        }
        for &view in &write.texel_buffer_views {
            behavior.read(ctx.world.intern_opaque(view));
        }
    }
    for copy in copies {
        match (ctx.world.lookup_opaque(copy.src_set), ctx.world.lookup_opaque(copy.dst_set)) {
            (Some(src), Some(dst)) => {
                behavior.read(src);
                behavior.modify(dst);
            }
            _ => error!("atom {atom_id:?}: vkCopyDescriptorSet referenced a set with no resource-registry entry (benign, skipped)"),
        }
    }
    Ok(())
}

/// `vkCmdBindDescriptorSets`. Per the open question in §9: the `Recreate` twin omits the deferred
/// data-access walk entirely, deferring only a read of each bound set's own key — preserved
/// verbatim from the distilled spec rather than "fixed", since downstream consumers may depend on
/// the asymmetry to distinguish the two call sites in their own diagnostics.
pub fn cmd_bind_descriptor_sets(
    ctx: &mut Ctx,
    atom_id: AtomId,
    command_buffer: u64,
    sets: &[u64],
    recreate: bool,
    behavior: &mut Behavior,
    scratch: &mut RecordScratch,
) -> Result<(), EngineError> {
    for &set in sets {
        let Some(set_key) = ctx.world.lookup_opaque(set) else {
            error!("atom {atom_id:?}: vkCmdBindDescriptorSets referenced set {set:#x} with no resource-registry entry (benign, skipped)");
            continue;
        };
        ctx.world.record_command(command_buffer, DeferredOp::ReadKey(set_key), behavior, scratch);

        if recreate {
            continue;
        }
        let Some(mirror) = ctx.state.descriptor_sets.get(&set) else {
            continue;
        };
        for binding in mirror.bindings.values() {
            match binding {
                DescriptorBindingMirror::ImageSamplers(pairs) => {
                    for &(_, view) in pairs {
                        let Some(view_key) = ctx.world.lookup_opaque(view) else {
                            continue;
                        };
                        ctx.world.record_command(command_buffer, DeferredOp::ReadKey(view_key), behavior, scratch);
                        let Some(view_mirror) = ctx.state.image_views.get(&view) else {
                            continue;
                        };
                        if let Some((memory, offset, size)) =
                            image_footprint(ctx.world, ctx.state, ctx.config, atom_id, view_mirror.image)?
                        {
                            ctx.world.record_command(
                                command_buffer,
                                DeferredOp::ReadOverlap { memory, offset, size },
                                behavior,
                                scratch,
                            );
                        }
                    }
                }
                DescriptorBindingMirror::Buffers(buffers) => {
                    for &buffer in buffers {
                        let buffer_key = ctx.world.intern_opaque(buffer);
                        ctx.world.record_command(command_buffer, DeferredOp::ModifyKey(buffer_key), behavior, scratch);
                        if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, buffer) {
                            ctx.world.record_command(
                                command_buffer,
                                DeferredOp::ModifyOverlap { memory, offset, size },
                                behavior,
                                scratch,
                            );
                        }
                    }
                }
                DescriptorBindingMirror::BufferViews(views) => {
                    for &view in views {
                        let Some(view_key) = ctx.world.lookup_opaque(view) else {
                            continue;
                        };
                        ctx.world.record_command(command_buffer, DeferredOp::ReadKey(view_key), behavior, scratch);
                        let Some(view_mirror) = ctx.state.buffer_views.get(&view) else {
                            continue;
                        };
                        if let Some((memory, offset, size)) = buffer_footprint(ctx.world, ctx.state, view_mirror.buffer) {
                            ctx.world.record_command(
                                command_buffer,
                                DeferredOp::ReadOverlap { memory, offset, size },
                                behavior,
                                scratch,
                            );
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
