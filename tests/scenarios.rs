//! End-to-end scenarios driving [`BehaviorProvider::behavior_for`] atom-by-atom, matching the
//! testable-properties list's worked examples.

use vk_trace_dce::prelude::*;

fn new_engine() -> (BehaviorProvider, GlobalState, SimpleDependencyGraph) {
    (BehaviorProvider::new(EngineConfig::default()), GlobalState::new(), SimpleDependencyGraph::new())
}

/// create -> allocate -> bind -> upload -> flush -> submit -> present, with the queue becoming a
/// graph root and the buffer's binding key reachable through the submitted command.
#[test]
fn create_bind_flush_submit_present_round_trip() {
    let (mut provider, mut state, mut graph) = new_engine();
    let mut id = 0u64;
    let mut next = |atom: Atom| {
        let b = provider.behavior_for(AtomId(id), &atom, &mut state, &mut graph);
        id += 1;
        b
    };

    next(Atom::CreateBuffer { buffer: 1, size: 128, recreate: false });
    next(Atom::AllocateMemory { memory: 10, dedicated_allocation: None });
    let bind = next(Atom::BindBufferMemory { buffer: 1, memory: 10, offset: 0 });
    assert!(!bind.aborted());
    next(Atom::UploadBufferData { buffer: 1 });
    let flush = next(Atom::FlushMappedMemoryRanges { ranges: vec![(10, 0, 128)] });
    assert!(!flush.writes().is_empty());

    next(Atom::AllocateCommandBuffers { command_buffers: vec![100] });
    next(Atom::BeginCommandBuffer { command_buffer: 100 });
    next(Atom::CmdBindIndexBuffer { command_buffer: 100, buffer: 1 });
    next(Atom::EndCommandBuffer { command_buffer: 100 });

    let submit = next(Atom::QueueSubmit { queue: 5, submit_infos: vec![vec![100]] });
    assert!(!submit.reads().is_empty(), "the deferred index-buffer read must fire at submit time");

    next(Atom::QueuePresentKHR { queue: 5 });
    let queue_key = provider.world().lookup_opaque(5).expect("queue was interned by submit/present");
    assert!(graph.is_root(queue_key));
}

/// A swapchain image bound with `conservative_swapchain_images` enabled gets a zero-size binding,
/// which must never be reported as overlapping anything, including itself at the same offset.
#[test]
fn swapchain_image_zero_size_binding_never_overlaps() {
    let (mut provider, mut state, mut graph) = new_engine();
    provider.behavior_for(AtomId(0), &Atom::CreateImage { image: 1, is_swapchain_image: true, recreate: false }, &mut state, &mut graph);
    provider.behavior_for(AtomId(1), &Atom::AllocateMemory { memory: 10, dedicated_allocation: None }, &mut state, &mut graph);
    let bind = provider.behavior_for(AtomId(2), &Atom::BindImageMemory { image: 1, memory: 10, offset: 0 }, &mut state, &mut graph);
    assert!(!bind.aborted(), "conservative swapchain images must not trigger image-size-inference failure");

    provider.behavior_for(AtomId(3), &Atom::AllocateCommandBuffers { command_buffers: vec![100] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(4), &Atom::BeginCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);
    // A second image bound into the same memory at the same offset must not be seen to overlap
    // the zero-size swapchain binding: a barrier naming both must not accidentally link them.
    provider.behavior_for(AtomId(5), &Atom::CreateImage { image: 2, is_swapchain_image: false, recreate: false }, &mut state, &mut graph);
    state.images.get_mut(&2).unwrap().inferred_size = Some(64);
    provider.behavior_for(AtomId(6), &Atom::BindImageMemory { image: 2, memory: 10, offset: 0 }, &mut state, &mut graph);
    let barrier = provider.behavior_for(
        AtomId(7),
        &Atom::CmdPipelineBarrier { command_buffer: 100, buffers: vec![], images: vec![1, 2] },
        &mut state,
        &mut graph,
    );
    assert!(!barrier.aborted());
}

/// LOAD op reads the attachment, DONT_CARE store op does not write it; STORE does.
#[test]
fn render_pass_load_store_matrix() {
    use ash::vk;
    let (mut provider, mut state, mut graph) = new_engine();
    let mut id = 0u64;
    let mut next = |state: &mut GlobalState, graph: &mut SimpleDependencyGraph, atom: Atom| {
        let b = provider.behavior_for(AtomId(id), &atom, state, graph);
        id += 1;
        b
    };

    next(&mut state, &mut graph, Atom::CreateImage { image: 1, is_swapchain_image: false, recreate: false });
    state.images.get_mut(&1).unwrap().inferred_size = Some(256);
    next(&mut state, &mut graph, Atom::AllocateMemory { memory: 10, dedicated_allocation: None });
    next(&mut state, &mut graph, Atom::BindImageMemory { image: 1, memory: 10, offset: 0 });
    next(&mut state, &mut graph, Atom::CreateImageView { view: 2, image: 1, recreate: false });
    next(
        &mut state,
        &mut graph,
        Atom::CreateRenderPass {
            render_pass: 3,
            attachments: vec![vk_trace_dce::global_state::AttachmentOps {
                load_op: vk::AttachmentLoadOp::LOAD,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
            }],
            recreate: false,
        },
    );
    next(&mut state, &mut graph, Atom::CreateFramebuffer { framebuffer: 4, render_pass: 3, attachments: vec![2], recreate: false });
    next(&mut state, &mut graph, Atom::AllocateCommandBuffers { command_buffers: vec![100] });
    next(&mut state, &mut graph, Atom::BeginCommandBuffer { command_buffer: 100 });

    let begin_rp = next(
        &mut state,
        &mut graph,
        Atom::CmdBeginRenderPass { command_buffer: 100, framebuffer: 4, render_pass: 3, recreate: false },
    );
    assert!(!begin_rp.aborted());
    next(&mut state, &mut graph, Atom::EndCommandBuffer { command_buffer: 100 });
    let submit = next(&mut state, &mut graph, Atom::QueueSubmit { queue: 5, submit_infos: vec![vec![100]] });
    assert!(!submit.reads().is_empty(), "LOAD must defer a read of the attachment image's binding");
    assert!(submit.writes().is_empty(), "DONT_CARE store must not defer any write");
}

/// Drawing with no prior bind still coalesces into exactly one recorded command, so a later bind
/// in the same command buffer (or the bare draw itself) can be resolved at submission time.
#[test]
fn draw_without_bind_still_coalesces_one_command() {
    let (mut provider, mut state, mut graph) = new_engine();
    provider.behavior_for(AtomId(0), &Atom::AllocateCommandBuffers { command_buffers: vec![100] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(1), &Atom::BeginCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);
    let draw = provider.behavior_for(AtomId(2), &Atom::CmdDraw { command_buffer: 100, recreate: false }, &mut state, &mut graph);
    assert!(!draw.aborted());
    assert_eq!(state.mirrored_command_count(100), 1);
}

/// A primary command buffer executing a secondary must resolve the secondary's recorded commands
/// as `SubCommandIndex::Secondary` entries once the primary is submitted.
#[test]
fn secondary_command_buffer_resolves_through_primary_submit() {
    let (mut provider, mut state, mut graph) = new_engine();
    provider.behavior_for(AtomId(0), &Atom::CreateBuffer { buffer: 1, size: 64, recreate: false }, &mut state, &mut graph);
    provider.behavior_for(AtomId(1), &Atom::AllocateMemory { memory: 10, dedicated_allocation: None }, &mut state, &mut graph);
    provider.behavior_for(AtomId(2), &Atom::BindBufferMemory { buffer: 1, memory: 10, offset: 0 }, &mut state, &mut graph);

    provider.behavior_for(AtomId(3), &Atom::AllocateCommandBuffers { command_buffers: vec![200] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(4), &Atom::BeginCommandBuffer { command_buffer: 200 }, &mut state, &mut graph);
    provider.behavior_for(AtomId(5), &Atom::CmdBindIndexBuffer { command_buffer: 200, buffer: 1 }, &mut state, &mut graph);
    provider.behavior_for(AtomId(6), &Atom::EndCommandBuffer { command_buffer: 200 }, &mut state, &mut graph);

    provider.behavior_for(AtomId(7), &Atom::AllocateCommandBuffers { command_buffers: vec![100] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(8), &Atom::BeginCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);
    provider.behavior_for(AtomId(9), &Atom::CmdExecuteCommands { command_buffer: 100, secondaries: vec![200] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(10), &Atom::EndCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);

    let submit = provider.behavior_for(AtomId(11), &Atom::QueueSubmit { queue: 5, submit_infos: vec![vec![100]] }, &mut state, &mut graph);
    assert!(!submit.reads().is_empty(), "the secondary's deferred index-buffer read must fire through the primary's submit");
}

/// Binding a descriptor set whose binding points at a buffer defers a read of that buffer's
/// binding, resolved when the command buffer referencing the bind is submitted.
#[test]
fn descriptor_indirect_memory_read_resolves_at_submit() {
    use ash::vk;
    let (mut provider, mut state, mut graph) = new_engine();
    provider.behavior_for(AtomId(0), &Atom::CreateBuffer { buffer: 1, size: 64, recreate: false }, &mut state, &mut graph);
    provider.behavior_for(AtomId(1), &Atom::AllocateMemory { memory: 10, dedicated_allocation: None }, &mut state, &mut graph);
    provider.behavior_for(AtomId(2), &Atom::BindBufferMemory { buffer: 1, memory: 10, offset: 0 }, &mut state, &mut graph);

    let write = DescriptorWrite {
        set: 2,
        binding: 0,
        descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
        image_infos: vec![],
        buffer_infos: vec![1],
        texel_buffer_views: vec![],
    };
    provider.behavior_for(AtomId(3), &Atom::UpdateDescriptorSets { writes: vec![write], copies: vec![] }, &mut state, &mut graph);

    provider.behavior_for(AtomId(4), &Atom::AllocateCommandBuffers { command_buffers: vec![100] }, &mut state, &mut graph);
    provider.behavior_for(AtomId(5), &Atom::BeginCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);
    let bind = provider.behavior_for(
        AtomId(6),
        &Atom::CmdBindDescriptorSets { command_buffer: 100, sets: vec![2], recreate: false },
        &mut state,
        &mut graph,
    );
    assert!(!bind.aborted());
    provider.behavior_for(AtomId(7), &Atom::EndCommandBuffer { command_buffer: 100 }, &mut state, &mut graph);

    let submit = provider.behavior_for(AtomId(8), &Atom::QueueSubmit { queue: 5, submit_infos: vec![vec![100]] }, &mut state, &mut graph);
    assert!(!submit.reads().is_empty(), "the descriptor-indirect buffer read must fire at submit time");
}
