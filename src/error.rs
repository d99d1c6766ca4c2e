//! Exposes the engine's error type.
//!
//! Errors map onto the three severities from the error handling design: benign missing state is
//! logged and substituted (never surfaced as an `EngineError`), an atom abort is surfaced as
//! `EngineError::Abort*` and turned into `Behavior::aborted`, and an unknown opcode is surfaced
//! as `EngineError::UnknownOpcode`.

use thiserror::Error;

use crate::atom::AtomId;

/// Error type the behavior-extraction engine can return from a mutator or dispatch step.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The atom's mutator reported a failure while advancing the global-state mirror.
    #[error("atom {0:?} mutator failed: {1}")]
    MutatorFailed(AtomId, String),
    /// Image size inference failed for a binding.
    #[error("atom {0:?} could not infer image size for binding")]
    ImageSizeInferenceFailed(AtomId),
    /// A descriptor write referenced a descriptor type this engine does not model.
    #[error("atom {0:?} referenced unhandled descriptor type {1:?}")]
    UnhandledDescriptorType(AtomId, ash::vk::DescriptorType),
    /// The atom's opcode is not one this engine recognizes.
    #[error("atom {0:?} has unknown opcode `{1}`")]
    UnknownOpcode(AtomId, String),
}

impl EngineError {
    /// Whether this error should be logged at the "analysis incomplete for this atom type"
    /// level (unknown opcode) rather than the plain abort level.
    pub fn is_unknown_opcode(&self) -> bool {
        matches!(self, EngineError::UnknownOpcode(..))
    }
}