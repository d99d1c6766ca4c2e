//! Shared memory-footprint resolution (§4.5), used by every handler that turns a bound image or
//! buffer into a `(memory, offset, size)` overlap query: copy-class commands, the data path, and
//! descriptor-indirect reads all go through the same two functions so the swapchain-image
//! convention and size-inference failure are handled in exactly one place.

use crate::atom::AtomId;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::global_state::GlobalState;
use crate::registry::ResourceRegistry;
use crate::state_key::StateKey;
use crate::world::WorldModel;

/// `image`'s current `(memory_root, offset, size)` footprint, or `None` if it has never been
/// bound. `size` is `0` for a swapchain image under the conservative policy (`EngineConfig`
/// default) — the overlap index already treats a zero-size binding as never-overlapping, so
/// callers need no special case.
pub fn image_footprint(
    world: &mut WorldModel,
    state: &GlobalState,
    config: &EngineConfig,
    atom_id: AtomId,
    image: u64,
) -> Result<Option<(StateKey, u64, u64)>, EngineError> {
    let Some(mirror) = state.images.get(&image) else {
        return Ok(None);
    };
    let Some(memory) = mirror.bound_memory else {
        return Ok(None);
    };
    let memory_root = world.get_or_create_memory(memory);
    if mirror.is_swapchain_image && config.conservative_swapchain_images {
        return Ok(Some((memory_root, mirror.bind_offset, 0)));
    }
    let size = state.infer_image_size(image).ok_or(EngineError::ImageSizeInferenceFailed(atom_id))?;
    Ok(Some((memory_root, mirror.bind_offset, size)))
}

/// `buffer`'s current `(memory_root, offset, size)` footprint, or `None` if it has never been
/// bound. Buffer sizes come from creation time, never inference, so there is no failure case.
pub fn buffer_footprint(world: &mut WorldModel, state: &GlobalState, buffer: u64) -> Option<(StateKey, u64, u64)> {
    let mirror = state.buffers.get(&buffer)?;
    let memory = mirror.bound_memory?;
    let memory_root = world.get_or_create_memory(memory);
    Some((memory_root, mirror.bind_offset, mirror.size))
}
