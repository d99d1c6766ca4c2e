//! Re-exports most commonly used types in the library.

pub use ash::vk;

pub use traits::*;

pub use crate::atom::{Atom, AtomId, DescriptorCopy, DescriptorWrite};
pub use crate::behavior::Behavior;
pub use crate::config::EngineConfig;
pub use crate::dependency_graph::{AccessKind, DependencyGraph, SimpleDependencyGraph, StateAddress};
pub use crate::error::EngineError;
pub use crate::global_state::GlobalState;
pub use crate::provider::BehaviorProvider;
pub use crate::state_key::{StateKey, StateKeyKind};
pub use crate::submission::{SubCommandIndex, SubmissionTable};
pub use crate::world::{DeferredOp, WorldModel};

/// Re-exports the trait boundaries embedders most often need to reach for.
pub mod traits {
    pub use crate::command_buffer::CommandRecordStore;
    pub use crate::dependency_graph::DependencyGraph;
    pub use crate::memory::MemoryOverlapIndex;
    pub use crate::registry::ResourceRegistry;
}
