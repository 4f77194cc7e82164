//! Reads the binary SWF container format: the header, the tag-framing
//! layer, and per-tag body decoders (shapes, morph shapes, placement and
//! removal, sprites).
//!
//! This crate does not decompress anything. `CWS`/`ZWS`-signed files carry
//! zlib/LZMA-compressed bodies; the caller is expected to decompress them
//! (e.g. with `flate2` or `lzma-rs`) and hand the resulting bytes to
//! [`decompress_swf`]/[`parse_swf`]. See [`read::Inflate`].

mod matrix;
pub mod error;
pub mod read;
pub mod string;
pub mod tag_code;
pub mod types;

pub use error::{Error, Result, TagDecodeFailure, TruncatedShape};
pub use matrix::Matrix;
pub use read::{decompress_swf, parse_swf, parse_tags, Inflate, Reader, SwfBuf};
pub use string::SwfStr;
pub use tag_code::TagCode;
pub use types::*;
