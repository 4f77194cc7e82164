//! Errors from decoding a document and from replaying its timeline.
//!
//! Framing and header failures from the `swf` crate are fatal to the whole
//! document and surface here as [`Error::Decode`]; everything else in this
//! crate is a recoverable condition the caller can inspect and move past,
//! matching the format's "a single malformed record never aborts the
//! document" design.

use swf::{CharacterId, Depth};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] swf::Error),
}

/// A second `Define*` tag for an id that already has a definition.
///
/// The library keeps the first definition and the second is dropped; the
/// caller is expected to log this rather than treat it as fatal, since
/// real-world content occasionally does this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("character id {id} was already defined; keeping the first definition")]
pub struct DuplicateCharacterId {
    pub id: CharacterId,
}

/// An error surfaced while replaying a frame's actions against a display
/// list. Recoverable: the offending action is skipped and replay continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DisplayListError {
    #[error("PlaceObject modify at depth {depth} has no existing instance")]
    ModifyMissingDepth { depth: Depth },
}
