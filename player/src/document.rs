//! Top-level decode entry point: turns a raw SWF buffer into a
//! [`Document`] (header, character library, and root timeline), plus a
//! report of every recoverable problem found along the way.

use crate::character::{Character, CharacterLibrary};
use crate::display_list::PlaceObjectData;
use crate::error::Error;
use crate::timeline::{Frame, FrameAction, Timeline};
use std::rc::Rc;
use swf::{CharacterId, Inflate, TagDecodeFailure};

/// A fully decoded document: the header, the shared character dictionary,
/// and the root timeline. Sprites defined anywhere in the document live in
/// the same `library`, addressed by id, never by direct reference.
#[derive(Debug)]
pub struct Document {
    pub header: swf::Header,
    pub library: CharacterLibrary,
    pub timeline: Timeline,
}

/// Every recoverable problem encountered while decoding. Decoding a
/// document never aborts because of these; the caller decides what to do
/// with them (log, surface in a UI, ignore).
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub tag_failures: Vec<TagDecodeFailure>,
    pub duplicate_character_ids: Vec<CharacterId>,
    /// Characters whose shape (or either half of a morph shape) decoded
    /// from a truncated record stream; see `swf::Shape::is_truncated`.
    pub truncated_character_ids: Vec<CharacterId>,
}

/// Decodes `input` into a [`Document`]. `inflate` is only invoked for
/// `CWS`/`ZWS`-signed input; see [`swf::Inflate`].
///
/// Fails only on a header or tag-framing problem, both of which leave the
/// decoder with no reliable place to resume from. Everything past that
/// point — an unknown fill type, a duplicate character id, a truncated
/// shape — is recorded in the returned [`DecodeReport`] instead.
pub fn decode(input: &[u8], inflate: &dyn Inflate) -> Result<(Document, DecodeReport), Error> {
    let swf_buf = swf::decompress_swf(input, inflate)?;
    let (movie, tag_failures) = swf::parse_swf(&swf_buf)?;

    let mut library = CharacterLibrary::new();
    let mut duplicate_character_ids = Vec::new();
    let mut truncated_character_ids = Vec::new();
    let timeline = build_timeline(
        movie.tags,
        movie.header.version,
        &mut library,
        &mut duplicate_character_ids,
        &mut truncated_character_ids,
    );

    let document = Document {
        header: movie.header,
        library,
        timeline,
    };
    let report = DecodeReport {
        tag_failures,
        duplicate_character_ids,
        truncated_character_ids,
    };
    Ok((document, report))
}

/// Walks one tag-framed stream (the document's own, or a sprite's nested
/// stream) into a [`Timeline`], defining every character it declares
/// directly into the shared `library`.
///
/// Recursion happens through `DefineSprite`, whose nested tag stream is
/// framed identically to the document's; the recursive call shares the
/// same `library` so that a shape defined inside a sprite is reachable by
/// id just like one defined at the top level.
fn build_timeline<'a>(
    tags: Vec<swf::Tag<'a>>,
    swf_version: u8,
    library: &mut CharacterLibrary,
    duplicate_character_ids: &mut Vec<CharacterId>,
    truncated_character_ids: &mut Vec<CharacterId>,
) -> Timeline {
    let mut timeline = Timeline::new();
    let mut actions = Vec::new();

    for tag in tags {
        match tag {
            swf::Tag::End => break,
            swf::Tag::ShowFrame => {
                timeline.add_frame(Frame {
                    actions: std::mem::take(&mut actions),
                });
            }
            swf::Tag::SetBackgroundColor(color) => {
                actions.push(FrameAction::SetBackgroundColor(color));
            }
            swf::Tag::DefineShape(shape) => {
                let id = shape.id;
                define_character(
                    library,
                    id,
                    Character::Shape(shape),
                    &mut actions,
                    duplicate_character_ids,
                    truncated_character_ids,
                );
            }
            swf::Tag::DefineMorphShape(morph) => {
                let id = morph.id;
                define_character(
                    library,
                    id,
                    Character::MorphShape(*morph),
                    &mut actions,
                    duplicate_character_ids,
                    truncated_character_ids,
                );
            }
            swf::Tag::DefineSprite(sprite) => {
                let id = sprite.id;
                let sub_timeline = build_timeline(
                    sprite.tags,
                    swf_version,
                    library,
                    duplicate_character_ids,
                    truncated_character_ids,
                );
                define_character(
                    library,
                    id,
                    Character::Sprite(sub_timeline),
                    &mut actions,
                    duplicate_character_ids,
                    truncated_character_ids,
                );
            }
            swf::Tag::PlaceObject(place) => {
                actions.push(FrameAction::PlaceObject(PlaceObjectData::from_swf(
                    *place,
                    swf_version,
                )));
            }
            swf::Tag::RemoveObject(remove) => {
                actions.push(FrameAction::RemoveObject {
                    depth: remove.depth,
                });
            }
            swf::Tag::Unknown { .. } => {}
        }
    }

    // A well-formed movie's last frame ends with ShowFrame before End, but
    // don't silently drop a trailing action list for content that doesn't.
    if !actions.is_empty() {
        timeline.add_frame(Frame { actions });
    }

    timeline
}

fn define_character(
    library: &mut CharacterLibrary,
    id: CharacterId,
    character: Character,
    actions: &mut Vec<FrameAction>,
    duplicate_character_ids: &mut Vec<CharacterId>,
    truncated_character_ids: &mut Vec<CharacterId>,
) {
    if character.is_truncated() {
        truncated_character_ids.push(id);
    }
    let character = Rc::new(character);
    match library.define(id, character.clone()) {
        Ok(()) => actions.push(FrameAction::DefineCharacter { id, character }),
        Err(error) => {
            log::warn!("{}", error);
            duplicate_character_ids.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopInflate;
    impl Inflate for NoopInflate {
        fn inflate(
            &self,
            _compression: swf::Compression,
            _input: &[u8],
        ) -> std::result::Result<Vec<u8>, String> {
            Ok(Vec::new())
        }
    }

    fn header_bytes(num_frames: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"FWS");
        data.push(6); // version
        data.extend_from_slice(&21u32.to_le_bytes()); // declared file length, unchecked
        data.push(0b0000_0000); // RECT: nbits = 0
        data.extend_from_slice(&0x0018u16.to_le_bytes()); // frame rate, fixed 8.8
        data.extend_from_slice(&num_frames.to_le_bytes());
        data
    }

    #[test]
    fn empty_document_has_no_frames_and_no_background() {
        let mut data = header_bytes(0);
        data.extend_from_slice(&[0, 0]); // End tag
        let (document, report) = decode(&data, &NoopInflate).unwrap();
        assert_eq!(document.timeline.frame_count(), 0);
        assert_eq!(document.timeline.background_color(), None);
        assert!(report.tag_failures.is_empty());
    }

    #[test]
    fn bad_signature_is_fatal() {
        let mut data = b"BAD".to_vec();
        data.extend_from_slice(&[6, 0, 0, 0, 0]);
        let result = decode(&data, &NoopInflate);
        assert!(matches!(result, Err(Error::Decode(swf::Error::BadSignature { .. }))));
    }

    // Minimal DefineShape1 body: characterId, an empty RECT (nBits = 0), an
    // empty fill style list, an empty line style list, a zeroed
    // numFillBits/numLineBits byte, and the all-zero end-of-shape record.
    fn define_shape1_body(id: u16) -> Vec<u8> {
        let mut body = id.to_le_bytes().to_vec();
        body.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        body
    }

    fn tag(code: u16, body: &[u8]) -> Vec<u8> {
        let mut out = ((code << 6) | body.len() as u16).to_le_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn redefining_a_character_id_is_reported_and_keeps_the_first_definition() {
        // Surfaces the `log::warn!` this test triggers under `--nocapture`.
        let _ = env_logger::try_init();
        let mut data = header_bytes(1);
        data.extend_from_slice(&tag(2, &define_shape1_body(1))); // DefineShape, id 1
        data.extend_from_slice(&tag(2, &define_shape1_body(1))); // DefineShape, id 1 again
        data.extend_from_slice(&tag(1, &[])); // ShowFrame
        data.extend_from_slice(&tag(0, &[])); // End

        let (document, report) = decode(&data, &NoopInflate).unwrap();
        assert_eq!(report.duplicate_character_ids, vec![1]);
        assert!(report.tag_failures.is_empty());
        assert!(document.library.get(1).unwrap().as_shape().is_some());
        assert_eq!(document.library.len(), 1);
    }

    /// One shape definition plus a `PlaceObject2` in a single frame — the
    /// uncompressed payload reused by the `CWS` test below.
    fn single_shape_one_frame_body(num_frames: u16) -> Vec<u8> {
        let mut data = header_bytes(num_frames);
        data.extend_from_slice(&tag(2, &define_shape1_body(1))); // DefineShape, id 1
        let place_object_2_body = {
            // flags byte: hasCharacter (bit 1) only; no matrix/colorTransform follow.
            let mut body = vec![0b0000_0010u8];
            body.extend_from_slice(&1u16.to_le_bytes()); // depth
            body.extend_from_slice(&1u16.to_le_bytes()); // characterId
            body
        };
        data.extend_from_slice(&tag(26, &place_object_2_body)); // PlaceObject2
        data.extend_from_slice(&tag(1, &[])); // ShowFrame
        data.extend_from_slice(&tag(0, &[])); // End
        data
    }

    /// Scenario D: a `CWS`-signed file whose inflate callback returns an
    /// uncompressed Scenario-B-shaped payload; decoding must produce the
    /// identical document regardless of the signature byte.
    #[test]
    fn compressed_signature_decodes_identically_to_uncompressed() {
        struct FixedInflate(Vec<u8>);
        impl Inflate for FixedInflate {
            fn inflate(
                &self,
                _compression: swf::Compression,
                _input: &[u8],
            ) -> std::result::Result<Vec<u8>, String> {
                Ok(self.0.clone())
            }
        }

        let uncompressed = single_shape_one_frame_body(1);
        let (plain_document, _) = decode(&uncompressed, &NoopInflate).unwrap();

        let mut compressed = b"CWS".to_vec();
        compressed.push(6); // version
        compressed.extend_from_slice(&0u32.to_le_bytes()); // declared length, unchecked
        compressed.extend_from_slice(b"whatever the compressed payload looks like");
        let inflate = FixedInflate(uncompressed[8..].to_vec());

        let (compressed_document, _) = decode(&compressed, &inflate).unwrap();
        assert_eq!(compressed_document.timeline.frame_count(), plain_document.timeline.frame_count());
        assert_eq!(compressed_document.library.len(), plain_document.library.len());
    }

    /// Scenario E: a `DefineShape` tag whose fill-style count byte is the
    /// `0xff` u16-escape but the tag body is truncated right after it. The
    /// framer still knows where the tag ends, so it must record a
    /// `TagDecodeFailure` for that one tag and keep decoding the
    /// `ShowFrame`/`End` tags that follow it.
    #[test]
    fn malformed_tag_is_recorded_and_decoding_continues() {
        let mut data = header_bytes(1);
        // DefineShape2 (version 2, so 0xff triggers the u16 escape), body:
        // characterId, RECT(nbits=0), then a lone 0xff fill-count byte with
        // nothing after it.
        let mut bad_shape_body = 1u16.to_le_bytes().to_vec();
        bad_shape_body.push(0x00); // RECT nbits = 0
        bad_shape_body.push(0xff); // fill style count escape with no u16 following
        data.extend_from_slice(&tag(22, &bad_shape_body)); // DefineShape2
        data.extend_from_slice(&tag(1, &[])); // ShowFrame
        data.extend_from_slice(&tag(0, &[])); // End

        let (document, report) = decode(&data, &NoopInflate).unwrap();
        assert_eq!(report.tag_failures.len(), 1);
        assert_eq!(report.tag_failures[0].code, 22);
        // The ShowFrame/End tags after the malformed one still decoded: one
        // (empty) frame was recorded and the library has no shape 1.
        assert_eq!(document.timeline.frame_count(), 1);
        assert!(document.library.get(1).is_none());
    }

    /// A `DefineShape` body that runs out of bytes mid-record-stream decodes
    /// successfully (unlike the malformed-tag case above) but with a partial
    /// shape; the document-level report must still surface it so a caller
    /// doesn't mistake it for a complete definition.
    #[test]
    fn truncated_shape_decodes_but_is_flagged_in_the_report() {
        let mut data = header_bytes(1);
        let mut truncated_shape_body = 1u16.to_le_bytes().to_vec();
        truncated_shape_body.extend_from_slice(&[0x00, 0x00, 0x00]); // RECT, fill count, line count
        truncated_shape_body.push(0x00); // numFillBits/numLineBits; no record bytes follow
        data.extend_from_slice(&tag(2, &truncated_shape_body)); // DefineShape
        data.extend_from_slice(&tag(1, &[])); // ShowFrame
        data.extend_from_slice(&tag(0, &[])); // End

        let (document, report) = decode(&data, &NoopInflate).unwrap();
        assert!(report.tag_failures.is_empty());
        assert_eq!(report.truncated_character_ids, vec![1]);
        let shape = document.library.get(1).unwrap().as_shape().unwrap();
        assert!(shape.is_truncated);
        assert!(shape.shape.is_empty());
    }
}
