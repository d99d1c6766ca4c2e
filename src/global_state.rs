//! The mutable `GlobalState` mirror (§6 / §4.7).
//!
//! This is the engine's view of "what the mutating interpreter has seen so far": which images
//! and buffers exist, what they are bound to, what a render pass's attachments look like, what a
//! descriptor set currently points at. The real interpreter that builds this mirror by replaying
//! a complete generated Vulkan command model is out of scope (§1); what is in scope, and defined
//! here, is the shape of the mirror the behavior provider reads from, plus the minimal per-CB
//! mirrored recording (§4.7) needed to emit subcommand indices without reimplementing a general
//! command-buffer interpreter.

use std::collections::HashMap;

use ash::vk;

use crate::atom::AtomId;
use crate::submission::SubCommandIndex;

/// Mirror of one `VkImage`.
#[derive(Debug, Clone, Default)]
pub struct ImageMirror {
    pub bound_memory: Option<u64>,
    pub bind_offset: u64,
    pub is_swapchain_image: bool,
    /// Result of the (external) image-size inference function; `None` models inference failure.
    pub inferred_size: Option<u64>,
}

/// Mirror of one `VkBuffer`.
#[derive(Debug, Clone, Default)]
pub struct BufferMirror {
    pub bound_memory: Option<u64>,
    pub bind_offset: u64,
    pub size: u64,
}

/// Mirror of one `VkImageView`.
#[derive(Debug, Clone, Copy)]
pub struct ImageViewMirror {
    pub image: u64,
}

/// Mirror of one `VkBufferView`.
#[derive(Debug, Clone, Copy)]
pub struct BufferViewMirror {
    pub buffer: u64,
}

/// Mirror of one `VkFramebuffer`.
#[derive(Debug, Clone)]
pub struct FramebufferMirror {
    pub render_pass: u64,
    pub attachments: Vec<u64>,
}

/// Load/store op pair for one render-pass attachment. The image view actually backing the
/// attachment at draw time is looked up separately, through the framebuffer mirror, by
/// attachment index.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentOps {
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
}

/// Mirror of one `VkRenderPass`.
#[derive(Debug, Clone)]
pub struct RenderPassMirror {
    pub attachments: Vec<AttachmentOps>,
}

/// What one binding of a descriptor set currently points at.
#[derive(Debug, Clone)]
pub enum DescriptorBindingMirror {
    /// Sampler/combined-image-sampler/sampled-image/storage-image/input-attachment bindings:
    /// `(sampler, image_view)` pairs (sampler handle is `0` for non-sampler descriptor types).
    ImageSamplers(Vec<(u64, u64)>),
    /// Uniform/storage/dynamic buffer bindings.
    Buffers(Vec<u64>),
    /// Uniform/storage texel buffer bindings.
    BufferViews(Vec<u64>),
}

/// Mirror of one `VkDescriptorSet`.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSetMirror {
    pub bindings: HashMap<u32, DescriptorBindingMirror>,
}

#[derive(Debug, Clone, Default)]
struct MirroredCommand {
    secondaries: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
struct CommandBufferMirror {
    recorded: Vec<MirroredCommand>,
}

/// The mutable global-state mirror consumed and updated by atom mutators.
#[derive(Default)]
pub struct GlobalState {
    pub images: HashMap<u64, ImageMirror>,
    pub buffers: HashMap<u64, BufferMirror>,
    pub framebuffers: HashMap<u64, FramebufferMirror>,
    pub render_passes: HashMap<u64, RenderPassMirror>,
    pub descriptor_sets: HashMap<u64, DescriptorSetMirror>,
    pub image_views: HashMap<u64, ImageViewMirror>,
    pub buffer_views: HashMap<u64, BufferViewMirror>,
    /// Per-memory list of `(offset, size)` bound ranges, as observed by the mutator. This is
    /// informational only — the authoritative overlap index lives in
    /// [`crate::world::WorldModel`]; handlers consult this to learn *whether* a resource is
    /// bound before creating the authoritative binding.
    pub memory_layout: HashMap<u64, Vec<(u64, u64)>>,
    /// Scratch subcommand-index list. Cleared by the provider before running each atom's
    /// mutator, drained by the execution resolver at submit-like atoms.
    pub sub_cmd_idx: Vec<SubCommandIndex>,
    /// The most recent submission-like atom, consulted by `vkSetEvent` to decide which
    /// submission's deferred work to resolve again.
    pub current_submission: Option<AtomId>,
    /// The raw command-buffer handles passed to the most recent `vkQueueSubmit`, grouped by
    /// `submitInfo` index. `vkSetEvent`'s mutator replays subcommand-index emission against this
    /// same shape (§4.7) — `SubmissionTable` records the state-key form separately, for the
    /// resolver.
    pub(crate) last_submission_cbs: Vec<Vec<u64>>,
    command_buffers: HashMap<u64, CommandBufferMirror>,
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a subcommand index into the scratch list. Stands in for the "installed callback"
    /// the distilled spec describes: in this single-threaded, same-call-frame engine, a plain
    /// scratch-buffer append is equivalent and avoids modeling a boxed closure hook.
    pub fn emit_subcommand(&mut self, index: SubCommandIndex) {
        self.sub_cmd_idx.push(index);
    }

    /// Image-size inference (§4.5). Returns `None` on inference failure.
    pub fn infer_image_size(&self, image: u64) -> Option<u64> {
        self.images.get(&image).and_then(|mirror| mirror.inferred_size)
    }

    pub(crate) fn note_recorded_command(&mut self, cb: u64) {
        self.command_buffers.entry(cb).or_default().recorded.push(MirroredCommand::default());
    }

    pub(crate) fn note_secondary(&mut self, cb: u64, secondary: u64) {
        if let Some(mirror) = self.command_buffers.get_mut(&cb) {
            if let Some(last) = mirror.recorded.last_mut() {
                last.secondaries.push(secondary);
            }
        }
    }

    pub(crate) fn reset_command_buffer_mirror(&mut self, cb: u64) {
        self.command_buffers.entry(cb).or_default().recorded.clear();
    }

    pub fn mirrored_command_count(&self, cb: u64) -> usize {
        self.command_buffers.get(&cb).map_or(0, |mirror| mirror.recorded.len())
    }

    pub(crate) fn mirrored_secondaries(&self, cb: u64, ci: usize) -> &[u64] {
        self.command_buffers
            .get(&cb)
            .and_then(|mirror| mirror.recorded.get(ci))
            .map_or(&[], |cmd| cmd.secondaries.as_slice())
    }
}
