//! Save block codecs.
//!
//! A save is a sequence of blocks, each starting with a five-byte `BLOCK`
//! tag. Only the first two are decoded here: the variables block and the
//! script block. Everything after them is carried through verbatim.

mod binary;
pub mod checksum;
pub mod globals;
pub mod scripts;
pub mod vars;

pub use checksum::{checksum, finalize, verify, OutputLength};
pub use globals::{pack_size, unpack_size, GlobalStore};
pub use scripts::{
    AttachType, Brain, BrainTrailer, ExecutionState, InvisibleObject, LodAssignment,
    MissionInfo, MissionPayload, ModelReplacement, ScriptAssignment, ScriptBlock, ScriptInfo,
    ScriptRecord, ScriptValues,
};
pub use vars::{MissionName, PlatformTrailer, VarBlock};

use thiserror::Error;

/// Tag that opens every save block
pub const BLOCK_TAG: &[u8; 5] = b"BLOCK";

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot shrink global store from {current} to {requested} words")]
    StoreShrink { current: usize, requested: usize },

    #[error("Global store has {0} words; the packed size needs at least 2")]
    StoreTooSmall(usize),

    #[error("Script position {0} is not aligned to a 4-byte boundary")]
    UnalignedPosition(u32),

    #[error("{len} bytes of code at position {position} do not fit in a {capacity}-byte store")]
    CodeOutOfBounds {
        position: u32,
        len: usize,
        capacity: usize,
    },

    #[error("Running script count is {declared} but {actual} scripts are present")]
    ScriptCountMismatch { declared: u32, actual: usize },

    #[error("{field} does not match the {platform} layout")]
    LayoutMismatch {
        field: &'static str,
        platform: &'static str,
    },

    #[error("Malformed instruction at byte offset {offset}")]
    MalformedInstruction { offset: usize },
}
