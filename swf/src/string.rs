//! A borrowed, encoding-agnostic string type used for names and identifiers
//! read out of an SWF tag body.
//!
//! SWF files do not carry an explicit text encoding; legacy (pre-v6) files are
//! typically Windows-1252 or Shift-JIS, while v6+ content is UTF-8. Since the
//! underlying bytes are never copied during decode, `SwfStr` borrows directly
//! from the tag's byte slice and only converts to `str`/`String` on demand.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::borrow::Cow;

/// A nul-terminated string as read from an SWF tag, still in its original
/// byte encoding.
#[derive(Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SwfStr([u8]);

impl SwfStr {
    /// Wraps a byte slice (with no trailing nul) as an `SwfStr`.
    pub fn from_bytes(str: &[u8]) -> &Self {
        // SAFETY: `SwfStr` is `repr(transparent)` over `[u8]`.
        unsafe { &*(str as *const [u8] as *const Self) }
    }

    pub fn from_str(str: &str) -> &Self {
        Self::from_bytes(str.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes this string using the default encoding for the given SWF
    /// version: UTF-8 for v6+, Windows-1252 otherwise. Invalid byte
    /// sequences are replaced rather than rejected, since a malformed name
    /// shouldn't abort the whole document.
    pub fn to_str_lossy(&self, swf_version: u8) -> Cow<'_, str> {
        self.decode(encoding_for_version(swf_version))
    }

    pub fn decode(&self, encoding: &'static Encoding) -> Cow<'_, str> {
        let (result, _used_encoding, _had_errors) = encoding.decode(&self.0);
        result
    }
}

/// The default encoding used for SWF text prior to the introduction of a
/// mandatory UTF-8 requirement in SWF6.
pub fn encoding_for_version(swf_version: u8) -> &'static Encoding {
    if swf_version >= 6 {
        UTF_8
    } else {
        WINDOWS_1252
    }
}
