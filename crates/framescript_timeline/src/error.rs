// SPDX-License-Identifier: MIT OR Apache-2.0
//! Usage errors raised by the timeline core.
//!
//! Pure numeric layers (easing, sampling, clamping, lane packing, trim math)
//! never fail. Only registration paths that can detect a scene-authoring
//! mistake return one of these.

use crate::animation::SequenceId;
use crate::value::VariableKind;
use crate::variable::VariableId;
use thiserror::Error;

/// Errors raised while creating or driving animation variables
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// A value of a different kind was given to a variable
    #[error("Variable kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind fixed at variable creation
        expected: VariableKind,
        /// Kind of the offending value
        found: VariableKind,
    },

    /// A component list could not be mapped to number, vec2 or vec3
    #[error("Ambiguous variable shape: {components} components")]
    AmbiguousShape {
        /// Number of components supplied
        components: usize,
    },

    /// A variable is already driven by another live sequence
    #[error("Variable {variable} is already driven by sequence {owner}")]
    OwnershipConflict {
        /// The contested variable
        variable: VariableId,
        /// The sequence currently owning it
        owner: SequenceId,
    },
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
