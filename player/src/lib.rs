//! A deterministic replay engine for decoded SWF documents.
//!
//! This crate consumes the tag stream produced by the `swf` crate and
//! turns it into a frame-addressable scene graph: a [`character::CharacterLibrary`]
//! of decoded definitions, and a [`timeline::Timeline`] whose
//! [`timeline::Timeline::seek`] produces the [`display_list::DisplayList`]
//! for any requested frame. It does not rasterize anything; the display
//! list and character library are the contract handed to an external
//! renderer.
//!
//! Decoding is a pure function from bytes to a [`document::Document`]:
//! single-threaded, synchronous, with no suspension points. See
//! [`document::decode`].

pub mod character;
pub mod display_list;
pub mod document;
pub mod error;
pub mod timeline;

pub use character::{Character, CharacterLibrary};
pub use display_list::{DisplayList, PlaceObjectData, PlacedObject};
pub use document::{decode, DecodeReport, Document};
pub use error::{DisplayListError, DuplicateCharacterId, Error};
pub use timeline::{Frame, FrameAction, Timeline};
