//! Error handling for BVH parsing and editing

use std::io;
use thiserror::Error;

/// Errors that can occur when working with BVH files
#[derive(Debug, Error)]
pub enum BvhError {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed HIERARCHY/MOTION structure or unexpected block nesting
    #[error("Grammar error at line {line}: {message}")]
    Grammar {
        /// The 1-based line number where the error was detected
        line: usize,
        /// What was expected or found
        message: String,
    },

    /// A declared channel or value count does not match the data given
    #[error("Channel count mismatch at line {line}: expected {expected} values, found {found}")]
    ChannelCountMismatch {
        /// The 1-based line number of the offending declaration or data line
        line: usize,
        /// The count the file declared
        expected: usize,
        /// The count actually present
        found: usize,
    },

    /// The declared `Frames:` count does not match the number of data lines
    #[error("Frame count mismatch: declared {expected} frames, found {found}")]
    FrameCountMismatch {
        /// The count declared by the `Frames:` header
        expected: usize,
        /// The number of data lines actually present
        found: usize,
    },

    /// The frame time is zero or negative while frames exist
    #[error("Invalid frame time {0}: must be strictly positive when frames exist")]
    InvalidFrameTime(f32),

    /// A channel was read or written that is not declared for the bone
    #[error("Channel '{channel}' is not declared for bone #{bone_index}")]
    UnknownChannel {
        /// The channel name that was requested
        channel: String,
        /// The pre-order index of the bone
        bone_index: usize,
    },

    /// A channel name appears more than once in a bone's channel list
    #[error("Duplicate channel '{channel}' for bone '{bone}'")]
    DuplicateChannel {
        /// The repeated channel name
        channel: String,
        /// The name of the bone (or "End Site")
        bone: String,
    },

    /// A bone name lookup failed
    #[error("No bone named '{0}' in the skeleton")]
    UnknownBone(String),

    /// Frame/skeleton shape mismatch during arithmetic or lookup
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    /// An operation required at least one frame but the motion has none
    #[error("Motion has no frames")]
    EmptyMotion,
}

/// Type alias for Results from BVH operations
pub type Result<T> = std::result::Result<T, BvhError>;
