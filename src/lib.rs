//! Behavior-extraction engine for dead-code elimination over captured Vulkan command traces.
//!
//! Given a linear sequence of [`atom::Atom`]s, [`provider::BehaviorProvider`] produces, for each
//! atom, a [`behavior::Behavior`] record enumerating the abstract state locations it reads,
//! writes, or modifies. A downstream dependency-graph module (see [`dependency_graph`]) consumes
//! these records to decide which atoms are reachable from designated roots and may safely be
//! dropped when replaying a subrange.
//!
//! ```
//! use vk_trace_dce::prelude::*;
//!
//! let mut provider = BehaviorProvider::new(EngineConfig::default());
//! let mut state = GlobalState::new();
//! let mut graph = SimpleDependencyGraph::new();
//!
//! let behavior = provider.behavior_for(
//!     AtomId(0),
//!     &Atom::CreateBuffer { buffer: 1, size: 256, recreate: false },
//!     &mut state,
//!     &mut graph,
//! );
//! assert_eq!(behavior.writes().len(), 1);
//! ```
//!
//! For further reading, check out the following modules
//! - [`state_key`] for the tagged, parent-linked node lattice every behavior is built from.
//! - [`world`] for the registry/memory/command-buffer state shared by the provider's traits.
//! - [`atom`] for the finite opcode enumeration and its `GlobalState` mutators.
//! - [`provider`] for `BehaviorProvider::behavior_for`, the crate's entry point.
//! - [`dependency_graph`] for the `DependencyGraph` collaborator boundary and its reference impl.

#[macro_use]
extern crate log;

pub mod atom;
pub mod behavior;
pub mod command_buffer;
pub mod config;
pub mod dependency_graph;
pub mod error;
pub mod global_state;
pub mod memory;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod state_key;
pub mod submission;
pub mod world;

pub use crate::prelude::*;
