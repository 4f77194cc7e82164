//! The byte/bit cursor, tag framer, and per-tag body decoders.
//!
//! Reading a file happens in two steps. [`decompress_swf`] peels off the
//! 8-byte signature/version/length header, hands the remaining bytes to a
//! caller-supplied [`Inflate`] when the file is `CWS`/`ZWS`-compressed, and
//! reads the frame size/rate/count that follow. [`parse_tags`] (or the
//! [`parse_swf`] convenience wrapper) then walks the resulting tag stream,
//! framing each tag and decoding its body with [`Reader`].
//!
//! A malformed tag *body* never aborts the whole file: [`parse_tags`] records
//! a [`TagDecodeFailure`](crate::TagDecodeFailure) and moves on to the next
//! tag, since the framer already knows where that tag ends. A malformed tag
//! *header* (an out-of-bounds length) does abort, because at that point the
//! reader no longer knows where the next tag starts.

use crate::error::{Error, Result, TagDecodeFailure, TruncatedShape};
use crate::string::SwfStr;
use crate::tag_code::TagCode;
use crate::types::*;
use crate::Matrix;
use byteorder::{ByteOrder, LittleEndian};
use num_traits::FromPrimitive;

/// Decompresses (if necessary) and performs zlib/LZMA-independent
/// decompression of a `CWS`/`ZWS` payload.
///
/// This crate has no opinion on which decompression library is used; the
/// caller supplies one. A typical implementation forwards to `flate2` for
/// `Compression::Zlib` and `lzma-rs` for `Compression::Lzma`, and is never
/// called for `Compression::None`.
pub trait Inflate {
    fn inflate(&self, compression: Compression, input: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// A decoded header paired with the (already decompressed) tag-stream bytes
/// that follow it.
#[derive(Debug, PartialEq)]
pub struct SwfBuf {
    pub header: Header,
    pub data: Vec<u8>,
}

/// Reads the 8-byte file header, decompresses the body via `inflate` if
/// needed, and reads the frame size/rate/count that precede the tag stream.
///
/// Returns the decoded [`Header`] and the tag-stream bytes ready for
/// [`parse_tags`].
pub fn decompress_swf(input: &[u8], inflate: &dyn Inflate) -> Result<SwfBuf> {
    if input.len() < 8 {
        return Err(Error::UnexpectedEndOfData { offset: input.len() });
    }
    let signature = [input[0], input[1], input[2]];
    let compression = match &signature {
        b"FWS" => Compression::None,
        b"CWS" => Compression::Zlib,
        b"ZWS" => Compression::Lzma,
        _ => return Err(Error::BadSignature { bytes: signature }),
    };
    let version = input[3];
    let uncompressed_length = LittleEndian::read_u32(&input[4..8]);
    let rest = &input[8..];
    let decompressed = match compression {
        Compression::None => rest.to_vec(),
        Compression::Zlib | Compression::Lzma => inflate
            .inflate(compression, rest)
            .map_err(|cause| Error::DecompressionFailed { cause })?,
    };

    let mut reader = Reader::new(&decompressed);
    let stage_size = reader.read_rectangle()?;
    reader.align();
    let frame_rate = reader.read_fixed8_8()?;
    let num_frames = reader.read_u16()?;
    let header = Header {
        compression,
        version,
        uncompressed_length,
        stage_size,
        frame_rate,
        num_frames,
    };
    let data = decompressed[reader.pos()..].to_vec();
    Ok(SwfBuf { header, data })
}

/// Decodes every tag in an already-decompressed [`SwfBuf`]'s tag stream.
///
/// The returned `Swf` borrows from `swf_buf`, which the caller keeps alive
/// for as long as the tags are needed (the same shape as
/// [`decompress_swf`] producing the buffer and this function borrowing it,
/// rather than one call owning both ends).
pub fn parse_swf<'a>(swf_buf: &'a SwfBuf) -> Result<(Swf<'a>, Vec<TagDecodeFailure>)> {
    let (tags, failures) = parse_tags(&swf_buf.data, swf_buf.header.version)?;
    Ok((
        Swf {
            header: swf_buf.header.clone(),
            tags,
        },
        failures,
    ))
}

/// Frames and decodes every tag in `data`, stopping at the first `End` tag
/// or at the end of the buffer, whichever comes first.
///
/// A framing failure (an out-of-bounds tag length) is fatal and is returned
/// as `Err`; a tag body decode failure is recorded in the second element of
/// the returned tuple and does not stop iteration.
pub fn parse_tags<'a>(data: &'a [u8], swf_version: u8) -> Result<(Vec<Tag<'a>>, Vec<TagDecodeFailure>)> {
    let mut tags = Vec::new();
    let mut failures = Vec::new();
    for framed in TagFramer::new(data) {
        let (code, offset, body) = framed?;
        match decode_tag(code, body, swf_version) {
            Ok(tag) => {
                let is_end = matches!(tag, Tag::End);
                tags.push(tag);
                if is_end {
                    break;
                }
            }
            Err(cause) => {
                log::warn!(
                    "tag {} at offset {} failed to decode: {}",
                    code,
                    offset,
                    cause
                );
                failures.push(TagDecodeFailure { code, offset, cause });
            }
        }
    }
    Ok((tags, failures))
}

/// Splits a tag stream into `(tag_code, body_offset, body)` triples without
/// looking at what any tag body contains.
///
/// Each short-form header is a `u16`: the top 10 bits are the tag code, the
/// bottom 6 are the length, or `0x3f` if the length doesn't fit and an
/// explicit `u32` length follows.
struct TagFramer<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> TagFramer<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for TagFramer<'a> {
    type Item = Result<(u16, usize, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }
        if self.pos + 2 > self.data.len() {
            self.done = true;
            return Some(Err(Error::UnexpectedEndOfData { offset: self.pos }));
        }
        let header = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        let code = header >> 6;
        let short_len = u32::from(header & 0x3f);
        let length = if short_len == 0x3f {
            if self.pos + 4 > self.data.len() {
                self.done = true;
                return Some(Err(Error::UnexpectedEndOfData { offset: self.pos }));
            }
            let len = LittleEndian::read_u32(&self.data[self.pos..]);
            self.pos += 4;
            len
        } else {
            short_len
        };

        let available = (self.data.len() - self.pos) as u32;
        if length > available {
            self.done = true;
            return Some(Err(Error::TruncatedTag {
                code,
                requested: length,
                available,
            }));
        }

        let body_offset = self.pos;
        let body = &self.data[self.pos..self.pos + length as usize];
        self.pos += length as usize;
        if code == 0 {
            self.done = true;
        }
        Some(Ok((code, body_offset, body)))
    }
}

fn decode_tag<'a>(code: u16, body: &'a [u8], swf_version: u8) -> Result<Tag<'a>> {
    match TagCode::from_u16(code) {
        Some(TagCode::End) => Ok(Tag::End),
        Some(TagCode::ShowFrame) => Ok(Tag::ShowFrame),
        Some(TagCode::SetBackgroundColor) => {
            let mut reader = Reader::new(body);
            Ok(Tag::SetBackgroundColor(reader.read_rgb()?))
        }
        Some(TagCode::DefineShape) => Ok(Tag::DefineShape(decode_define_shape(body, 1)?)),
        Some(TagCode::DefineShape2) => Ok(Tag::DefineShape(decode_define_shape(body, 2)?)),
        Some(TagCode::DefineShape3) => Ok(Tag::DefineShape(decode_define_shape(body, 3)?)),
        Some(TagCode::DefineShape4) => Ok(Tag::DefineShape(decode_define_shape(body, 4)?)),
        Some(TagCode::DefineMorphShape) => Ok(Tag::DefineMorphShape(Box::new(
            decode_define_morph_shape(body, 1)?,
        ))),
        Some(TagCode::DefineMorphShape2) => Ok(Tag::DefineMorphShape(Box::new(
            decode_define_morph_shape(body, 2)?,
        ))),
        Some(TagCode::DefineSprite) => Ok(Tag::DefineSprite(decode_define_sprite(body, swf_version)?)),
        Some(TagCode::PlaceObject) => Ok(Tag::PlaceObject(Box::new(decode_place_object(body)?))),
        Some(TagCode::PlaceObject2) => Ok(Tag::PlaceObject(Box::new(decode_place_object_2(body)?))),
        Some(TagCode::PlaceObject3) => Ok(Tag::PlaceObject(Box::new(decode_place_object_3(body)?))),
        Some(TagCode::RemoveObject) => Ok(Tag::RemoveObject(decode_remove_object(body)?)),
        Some(TagCode::RemoveObject2) => Ok(Tag::RemoveObject(decode_remove_object_2(body)?)),
        None => Ok(Tag::Unknown {
            tag_code: code,
            data: body,
        }),
    }
}

fn decode_define_sprite<'a>(body: &'a [u8], swf_version: u8) -> Result<Sprite<'a>> {
    let mut reader = Reader::new(body);
    let id = reader.read_u16()?;
    let num_frames = reader.read_u16()?;
    let (tags, failures) = parse_tags(&body[reader.pos()..], swf_version)?;
    for failure in failures {
        log::warn!(
            "sprite {} tag {} at offset {} failed to decode: {}",
            id,
            failure.code,
            failure.offset,
            failure.cause
        );
    }
    Ok(Sprite {
        id,
        num_frames,
        tags,
    })
}

fn decode_place_object<'a>(body: &'a [u8]) -> Result<PlaceObject<'a>> {
    let mut reader = Reader::new(body);
    let character_id = reader.read_u16()?;
    let depth = reader.read_u16()?;
    let matrix = if reader.bytes_remaining() > 0 {
        Some(reader.read_matrix()?)
    } else {
        None
    };
    let color_transform = if reader.bytes_remaining() > 0 {
        Some(reader.read_color_transform_no_alpha()?)
    } else {
        None
    };
    Ok(PlaceObject {
        version: 1,
        action: PlaceObjectAction::Place(character_id),
        depth,
        matrix,
        color_transform,
        ratio: None,
        name: None,
        clip_depth: None,
        class_name: None,
        filters: None,
        blend_mode: None,
        is_bitmap_cached: None,
        is_visible: None,
        clip_actions_data: None,
    })
}

fn decode_place_object_2<'a>(body: &'a [u8]) -> Result<PlaceObject<'a>> {
    let mut reader = Reader::new(body);
    let flags = reader.read_u8()?;
    let has_clip_actions = flags & 0b1000_0000 != 0;
    let has_clip_depth = flags & 0b0100_0000 != 0;
    let has_name = flags & 0b0010_0000 != 0;
    let has_ratio = flags & 0b0001_0000 != 0;
    let has_color_transform = flags & 0b0000_1000 != 0;
    let has_matrix = flags & 0b0000_0100 != 0;
    let has_character = flags & 0b0000_0010 != 0;
    let has_move = flags & 0b0000_0001 != 0;

    let depth = reader.read_u16()?;
    let character_id = if has_character {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let matrix = if has_matrix {
        Some(reader.read_matrix()?)
    } else {
        None
    };
    let color_transform = if has_color_transform {
        Some(reader.read_color_transform()?)
    } else {
        None
    };
    let ratio = if has_ratio { Some(reader.read_u16()?) } else { None };
    let name = if has_name {
        Some(reader.read_str()?)
    } else {
        None
    };
    let clip_depth = if has_clip_depth {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let clip_actions_data = if has_clip_actions {
        Some(&body[reader.pos()..])
    } else {
        None
    };

    let action = match (character_id, has_move) {
        (Some(id), true) => PlaceObjectAction::Replace(id),
        (Some(id), false) => PlaceObjectAction::Place(id),
        (None, _) => PlaceObjectAction::Modify,
    };

    Ok(PlaceObject {
        version: 2,
        action,
        depth,
        matrix,
        color_transform,
        ratio,
        name,
        clip_depth,
        class_name: None,
        filters: None,
        blend_mode: None,
        is_bitmap_cached: None,
        is_visible: None,
        clip_actions_data,
    })
}

fn decode_place_object_3<'a>(body: &'a [u8]) -> Result<PlaceObject<'a>> {
    let mut reader = Reader::new(body);
    let flags1 = reader.read_u8()?;
    let flags2 = reader.read_u8()?;

    let has_clip_actions = flags1 & 0b1000_0000 != 0;
    let has_clip_depth = flags1 & 0b0100_0000 != 0;
    let has_name = flags1 & 0b0010_0000 != 0;
    let has_ratio = flags1 & 0b0001_0000 != 0;
    let has_color_transform = flags1 & 0b0000_1000 != 0;
    let has_matrix = flags1 & 0b0000_0100 != 0;
    let has_character = flags1 & 0b0000_0010 != 0;
    let has_move = flags1 & 0b0000_0001 != 0;

    let opaque_background = flags2 & 0b0100_0000 != 0;
    let has_visible = flags2 & 0b0010_0000 != 0;
    let is_image = flags2 & 0b0001_0000 != 0;
    let has_class_name = flags2 & 0b0000_1000 != 0;
    let has_cache_as_bitmap = flags2 & 0b0000_0100 != 0;
    let has_blend_mode = flags2 & 0b0000_0010 != 0;
    let has_filter_list = flags2 & 0b0000_0001 != 0;

    let depth = reader.read_u16()?;
    let class_name = if has_class_name || (is_image && has_character) {
        Some(reader.read_str()?)
    } else {
        None
    };
    let character_id = if has_character {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let matrix = if has_matrix {
        Some(reader.read_matrix()?)
    } else {
        None
    };
    let color_transform = if has_color_transform {
        Some(reader.read_color_transform()?)
    } else {
        None
    };
    let ratio = if has_ratio { Some(reader.read_u16()?) } else { None };
    let name = if has_name {
        Some(reader.read_str()?)
    } else {
        None
    };
    let clip_depth = if has_clip_depth {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let filters = if has_filter_list {
        Some(read_filter_list(&mut reader)?)
    } else {
        None
    };
    let blend_mode = if has_blend_mode {
        Some(decode_blend_mode(reader.read_u8()?))
    } else {
        None
    };
    let is_bitmap_cached = if has_cache_as_bitmap {
        Some(reader.read_u8()? != 0)
    } else {
        None
    };
    let is_visible = if has_visible {
        Some(reader.read_u8()? != 0)
    } else {
        None
    };
    if opaque_background {
        // Background color; display compositing is out of scope, but we
        // must still step past it to find clip_actions_data correctly.
        let _ = reader.read_rgba()?;
    }
    let clip_actions_data = if has_clip_actions {
        Some(&body[reader.pos()..])
    } else {
        None
    };

    let action = match (character_id, has_move) {
        (Some(id), true) => PlaceObjectAction::Replace(id),
        (Some(id), false) => PlaceObjectAction::Place(id),
        (None, _) => PlaceObjectAction::Modify,
    };

    Ok(PlaceObject {
        version: 3,
        action,
        depth,
        matrix,
        color_transform,
        ratio,
        name,
        clip_depth,
        class_name,
        filters,
        blend_mode,
        is_bitmap_cached,
        is_visible,
        clip_actions_data,
    })
}

fn decode_remove_object(body: &[u8]) -> Result<RemoveObject> {
    let mut reader = Reader::new(body);
    let character_id = reader.read_u16()?;
    let depth = reader.read_u16()?;
    Ok(RemoveObject {
        depth,
        character_id: Some(character_id),
    })
}

fn decode_remove_object_2(body: &[u8]) -> Result<RemoveObject> {
    let mut reader = Reader::new(body);
    let depth = reader.read_u16()?;
    Ok(RemoveObject {
        depth,
        character_id: None,
    })
}

fn decode_blend_mode(value: u8) -> BlendMode {
    match value {
        2 => BlendMode::Layer,
        3 => BlendMode::Multiply,
        4 => BlendMode::Screen,
        5 => BlendMode::Lighten,
        6 => BlendMode::Darken,
        7 => BlendMode::Difference,
        8 => BlendMode::Add,
        9 => BlendMode::Subtract,
        10 => BlendMode::Invert,
        11 => BlendMode::Alpha,
        12 => BlendMode::Erase,
        13 => BlendMode::Overlay,
        14 => BlendMode::HardLight,
        _ => BlendMode::Normal,
    }
}

fn read_filter_list(reader: &mut Reader) -> Result<Vec<Filter>> {
    let count = reader.read_u8()?;
    (0..count).map(|_| read_filter(reader)).collect()
}

fn read_filter(reader: &mut Reader) -> Result<Filter> {
    let offset = reader.pos();
    let filter_id = reader.read_u8()?;
    match filter_id {
        0 => Ok(Filter::DropShadowFilter(Box::new(read_drop_shadow_filter(
            reader,
        )?))),
        1 => Ok(Filter::BlurFilter(Box::new(read_blur_filter(reader)?))),
        2 => Ok(Filter::GlowFilter(Box::new(read_glow_filter(reader)?))),
        3 => Ok(Filter::BevelFilter(Box::new(read_bevel_filter(reader)?))),
        4 => Ok(Filter::GradientGlowFilter(Box::new(
            read_gradient_glow_filter(reader)?,
        ))),
        5 => Ok(Filter::ConvolutionFilter(Box::new(read_convolution_filter(
            reader,
        )?))),
        6 => Ok(Filter::ColorMatrixFilter(Box::new(read_color_matrix_filter(
            reader,
        )?))),
        7 => Ok(Filter::GradientBevelFilter(Box::new(
            read_gradient_bevel_filter(reader)?,
        ))),
        _ => Err(Error::UnknownFilterType {
            value: filter_id,
            offset,
        }),
    }
}

fn read_drop_shadow_filter(reader: &mut Reader) -> Result<DropShadowFilter> {
    let color = reader.read_rgba()?;
    let blur_x = f64::from(reader.read_fixed16_16()?);
    let blur_y = f64::from(reader.read_fixed16_16()?);
    let angle = f64::from(reader.read_fixed16_16()?);
    let distance = f64::from(reader.read_fixed16_16()?);
    let strength = reader.read_fixed8_8()?;
    let is_inner = reader.read_bit()?;
    let is_knockout = reader.read_bit()?;
    let _composite_source = reader.read_bit()?;
    let num_passes = reader.read_ubits(5)? as u8;
    Ok(DropShadowFilter {
        color,
        blur_x,
        blur_y,
        angle,
        distance,
        strength,
        is_inner,
        is_knockout,
        num_passes,
    })
}

fn read_blur_filter(reader: &mut Reader) -> Result<BlurFilter> {
    let blur_x = f64::from(reader.read_fixed16_16()?);
    let blur_y = f64::from(reader.read_fixed16_16()?);
    let num_passes = reader.read_ubits(5)? as u8;
    let _reserved = reader.read_ubits(3)?;
    Ok(BlurFilter {
        blur_x,
        blur_y,
        num_passes,
    })
}

fn read_glow_filter(reader: &mut Reader) -> Result<GlowFilter> {
    let color = reader.read_rgba()?;
    let blur_x = f64::from(reader.read_fixed16_16()?);
    let blur_y = f64::from(reader.read_fixed16_16()?);
    let strength = reader.read_fixed8_8()?;
    let is_inner = reader.read_bit()?;
    let is_knockout = reader.read_bit()?;
    let _composite_source = reader.read_bit()?;
    let num_passes = reader.read_ubits(5)? as u8;
    Ok(GlowFilter {
        color,
        blur_x,
        blur_y,
        strength,
        is_inner,
        is_knockout,
        num_passes,
    })
}

fn read_bevel_filter(reader: &mut Reader) -> Result<BevelFilter> {
    let shadow_color = reader.read_rgba()?;
    let highlight_color = reader.read_rgba()?;
    let blur_x = f64::from(reader.read_fixed16_16()?);
    let blur_y = f64::from(reader.read_fixed16_16()?);
    let angle = f64::from(reader.read_fixed16_16()?);
    let distance = f64::from(reader.read_fixed16_16()?);
    let strength = reader.read_fixed8_8()?;
    let is_inner = reader.read_bit()?;
    let is_knockout = reader.read_bit()?;
    let _composite_source = reader.read_bit()?;
    let is_on_top = reader.read_bit()?;
    let num_passes = reader.read_ubits(4)? as u8;
    Ok(BevelFilter {
        shadow_color,
        highlight_color,
        blur_x,
        blur_y,
        angle,
        distance,
        strength,
        is_inner,
        is_knockout,
        is_on_top,
        num_passes,
    })
}

fn read_gradient_glow_filter(reader: &mut Reader) -> Result<GradientGlowFilter> {
    let num_colors = reader.read_u8()? as usize;
    let mut colors = Vec::with_capacity(num_colors);
    for _ in 0..num_colors {
        colors.push(GradientRecord {
            ratio: 0,
            color: reader.read_rgba()?,
        });
    }
    for record in colors.iter_mut() {
        record.ratio = reader.read_u8()?;
    }
    let blur_x = f64::from(reader.read_fixed16_16()?);
    let blur_y = f64::from(reader.read_fixed16_16()?);
    let angle = f64::from(reader.read_fixed16_16()?);
    let distance = f64::from(reader.read_fixed16_16()?);
    let strength = reader.read_fixed8_8()?;
    let is_inner = reader.read_bit()?;
    let is_knockout = reader.read_bit()?;
    let _composite_source = reader.read_bit()?;
    let is_on_top = reader.read_bit()?;
    let num_passes = reader.read_ubits(4)? as u8;
    Ok(GradientGlowFilter {
        colors,
        blur_x,
        blur_y,
        angle,
        distance,
        strength,
        is_inner,
        is_knockout,
        is_on_top,
        num_passes,
    })
}

fn read_gradient_bevel_filter(reader: &mut Reader) -> Result<GradientBevelFilter> {
    // Identical wire layout to GradientGlowFilter.
    let g = read_gradient_glow_filter(reader)?;
    Ok(GradientBevelFilter {
        colors: g.colors,
        blur_x: g.blur_x,
        blur_y: g.blur_y,
        angle: g.angle,
        distance: g.distance,
        strength: g.strength,
        is_inner: g.is_inner,
        is_knockout: g.is_knockout,
        is_on_top: g.is_on_top,
        num_passes: g.num_passes,
    })
}

fn read_convolution_filter(reader: &mut Reader) -> Result<ConvolutionFilter> {
    let num_matrix_cols = reader.read_u8()?;
    let num_matrix_rows = reader.read_u8()?;
    let divisor = f64::from(reader.read_f32()?);
    let bias = f64::from(reader.read_f32()?);
    let count = num_matrix_cols as usize * num_matrix_rows as usize;
    let mut matrix = Vec::with_capacity(count);
    for _ in 0..count {
        matrix.push(f64::from(reader.read_f32()?));
    }
    let default_color = reader.read_rgba()?;
    let _reserved = reader.read_ubits(6)?;
    let is_clamped = reader.read_bit()?;
    let is_preserve_alpha = reader.read_bit()?;
    Ok(ConvolutionFilter {
        num_matrix_rows,
        num_matrix_cols,
        matrix,
        divisor,
        bias,
        default_color,
        is_clamped,
        is_preserve_alpha,
    })
}

fn read_color_matrix_filter(reader: &mut Reader) -> Result<ColorMatrixFilter> {
    let mut matrix = [0f64; 20];
    for entry in matrix.iter_mut() {
        *entry = f64::from(reader.read_f32()?);
    }
    Ok(ColorMatrixFilter { matrix })
}

/// Bitmap fill style type bytes encode repeating/clipped and
/// smoothed/non-smoothed in their low two bits.
fn bitmap_fill_flags(fill_style_type: u8) -> (bool, bool) {
    let is_repeating = fill_style_type & 0b01 == 0;
    let is_smoothed = fill_style_type & 0b10 == 0;
    (is_repeating, is_smoothed)
}

fn read_style_count(reader: &mut Reader, shape_version: u8) -> Result<u32> {
    let count = u32::from(reader.read_u8()?);
    if count == 0xff && shape_version >= 2 {
        Ok(u32::from(reader.read_u16()?))
    } else {
        Ok(count)
    }
}

fn read_fill_style_list(reader: &mut Reader, shape_version: u8) -> Result<Vec<FillStyle>> {
    let count = read_style_count(reader, shape_version)?;
    (0..count).map(|_| read_fill_style(reader, shape_version)).collect()
}

fn read_fill_style(reader: &mut Reader, shape_version: u8) -> Result<FillStyle> {
    let offset = reader.pos();
    let fill_style_type = reader.read_u8()?;
    match fill_style_type {
        0x00 => {
            let color = if shape_version >= 3 {
                reader.read_rgba()?
            } else {
                reader.read_rgb()?
            };
            Ok(FillStyle::Color(color))
        }
        0x10 => Ok(FillStyle::LinearGradient(read_gradient(reader, shape_version)?)),
        0x12 => Ok(FillStyle::RadialGradient(read_gradient(reader, shape_version)?)),
        0x13 => {
            let gradient = read_gradient(reader, shape_version)?;
            let focal_point = reader.read_fixed8_8()?;
            Ok(FillStyle::FocalGradient {
                gradient,
                focal_point,
            })
        }
        0x40 | 0x41 | 0x42 | 0x43 => {
            let id = reader.read_u16()?;
            let matrix = reader.read_matrix()?;
            let (is_repeating, is_smoothed) = bitmap_fill_flags(fill_style_type);
            Ok(FillStyle::Bitmap {
                id,
                matrix,
                is_smoothed,
                is_repeating,
            })
        }
        _ => Err(Error::UnknownFillType {
            value: fill_style_type,
            offset,
        }),
    }
}

fn spread_from_bits(bits: u32) -> GradientSpread {
    match bits {
        1 => GradientSpread::Reflect,
        2 => GradientSpread::Repeat,
        _ => GradientSpread::Pad,
    }
}

fn interpolation_from_bits(bits: u32) -> GradientInterpolation {
    match bits {
        1 => GradientInterpolation::LinearRgb,
        _ => GradientInterpolation::Rgb,
    }
}

fn read_gradient(reader: &mut Reader, shape_version: u8) -> Result<Gradient> {
    let matrix = reader.read_matrix()?;
    reader.align();
    let spread = spread_from_bits(reader.read_ubits(2)?);
    let interpolation = interpolation_from_bits(reader.read_ubits(2)?);
    let num_records = reader.read_ubits(4)? as usize;
    let records = (0..num_records)
        .map(|_| read_gradient_record(reader, shape_version))
        .collect::<Result<Vec<_>>>()?;
    Ok(Gradient {
        matrix,
        spread,
        interpolation,
        records,
    })
}

fn read_gradient_record(reader: &mut Reader, shape_version: u8) -> Result<GradientRecord> {
    let ratio = reader.read_u8()?;
    let color = if shape_version >= 3 {
        reader.read_rgba()?
    } else {
        reader.read_rgb()?
    };
    Ok(GradientRecord { ratio, color })
}

fn cap_style_from_bits(bits: u32) -> LineCapStyle {
    match bits {
        1 => LineCapStyle::None,
        2 => LineCapStyle::Square,
        _ => LineCapStyle::Round,
    }
}

fn read_line_style_list(reader: &mut Reader, shape_version: u8) -> Result<Vec<LineStyle>> {
    let count = read_style_count(reader, shape_version)?;
    (0..count)
        .map(|_| read_line_style(reader, shape_version))
        .collect()
}

fn read_line_style(reader: &mut Reader, shape_version: u8) -> Result<LineStyle> {
    if shape_version >= 4 {
        read_line_style_2(reader, shape_version)
    } else {
        let width = Twips::new(i32::from(reader.read_u16()?));
        let color = if shape_version >= 3 {
            reader.read_rgba()?
        } else {
            reader.read_rgb()?
        };
        Ok(LineStyle::new_v1(width, color))
    }
}

fn read_line_style_2(reader: &mut Reader, shape_version: u8) -> Result<LineStyle> {
    let width = Twips::new(i32::from(reader.read_u16()?));
    let start_cap = cap_style_from_bits(reader.read_ubits(2)?);
    let join_style_bits = reader.read_ubits(2)?;
    let has_fill = reader.read_bit()?;
    let allow_scale_x = !reader.read_bit()?;
    let allow_scale_y = !reader.read_bit()?;
    let is_pixel_hinted = reader.read_bit()?;
    let _reserved = reader.read_ubits(5)?;
    let allow_close = !reader.read_bit()?;
    let end_cap = cap_style_from_bits(reader.read_ubits(2)?);
    let join_style = match join_style_bits {
        1 => LineJoinStyle::Bevel,
        2 => LineJoinStyle::Miter(reader.read_fixed8_8()?),
        _ => LineJoinStyle::Round,
    };
    let (color, fill_style) = if has_fill {
        (Color::default(), Some(read_fill_style(reader, shape_version)?))
    } else {
        (reader.read_rgba()?, None)
    };
    Ok(LineStyle {
        width,
        color,
        start_cap,
        end_cap,
        join_style,
        fill_style,
        allow_scale_x,
        allow_scale_y,
        is_pixel_hinted,
        allow_close,
    })
}

/// Reads one shape record, mutating `ctx` when a style-change record
/// declares new styles (and thus new fill/line index bit widths).
///
/// Returns `Ok(None)` for the all-zero-flags end-of-shape record.
fn read_shape_record(reader: &mut Reader, ctx: &mut ShapeContext) -> Result<Option<ShapeRecord>> {
    let is_edge = reader.read_bit()?;
    if !is_edge {
        let new_styles = reader.read_bit()?;
        let has_line_style = reader.read_bit()?;
        let has_fill_style_1 = reader.read_bit()?;
        let has_fill_style_0 = reader.read_bit()?;
        let has_move = reader.read_bit()?;
        if !new_styles && !has_line_style && !has_fill_style_1 && !has_fill_style_0 && !has_move {
            return Ok(None);
        }
        let move_to = if has_move {
            let num_bits = reader.read_ubits(5)?;
            let x = reader.read_sbits(num_bits)?;
            let y = reader.read_sbits(num_bits)?;
            Some((Twips::new(x), Twips::new(y)))
        } else {
            None
        };
        // A 0-bit-wide read always yields index 0, which doubles as "no
        // style"; no separate case is needed for numFillBits/numLineBits == 0.
        let fill_style_0 = if has_fill_style_0 {
            Some(reader.read_ubits(u32::from(ctx.num_fill_bits))?)
        } else {
            None
        };
        let fill_style_1 = if has_fill_style_1 {
            Some(reader.read_ubits(u32::from(ctx.num_fill_bits))?)
        } else {
            None
        };
        let line_style = if has_line_style {
            Some(reader.read_ubits(u32::from(ctx.num_line_bits))?)
        } else {
            None
        };
        let new_styles_data = if new_styles {
            reader.align();
            let fill_styles = read_fill_style_list(reader, ctx.shape_version)?;
            let line_styles = read_line_style_list(reader, ctx.shape_version)?;
            ctx.num_fill_bits = reader.read_ubits(4)? as u8;
            ctx.num_line_bits = reader.read_ubits(4)? as u8;
            Some(ShapeStyles {
                fill_styles,
                line_styles,
            })
        } else {
            None
        };
        Ok(Some(ShapeRecord::StyleChange(Box::new(StyleChangeData {
            move_to,
            fill_style_0,
            fill_style_1,
            line_style,
            new_styles: new_styles_data,
        }))))
    } else {
        let is_straight = reader.read_bit()?;
        let num_bits = reader.read_ubits(4)? + 2;
        if is_straight {
            let is_general_line = reader.read_bit()?;
            let (dx, dy) = if is_general_line {
                (reader.read_sbits(num_bits)?, reader.read_sbits(num_bits)?)
            } else {
                let is_vertical = reader.read_bit()?;
                if is_vertical {
                    (0, reader.read_sbits(num_bits)?)
                } else {
                    (reader.read_sbits(num_bits)?, 0)
                }
            };
            Ok(Some(ShapeRecord::StraightEdge {
                delta_x: Twips::new(dx),
                delta_y: Twips::new(dy),
            }))
        } else {
            let control_delta_x = Twips::new(reader.read_sbits(num_bits)?);
            let control_delta_y = Twips::new(reader.read_sbits(num_bits)?);
            let anchor_delta_x = Twips::new(reader.read_sbits(num_bits)?);
            let anchor_delta_y = Twips::new(reader.read_sbits(num_bits)?);
            Ok(Some(ShapeRecord::CurvedEdge {
                control_delta_x,
                control_delta_y,
                anchor_delta_x,
                anchor_delta_y,
            }))
        }
    }
}

/// Reads shape records until the end-of-shape marker or EOF.
///
/// An EOF mid-stream is treated as a recoverable truncation: the records
/// decoded so far are returned (with the second element of the tuple set to
/// `true`) rather than failing the whole tag. Callers fold this into a
/// `TruncatedShape` they attach to the decoded `Shape`/`MorphShape`, so a
/// caller inspecting the result can tell a complete shape from a partial one
/// instead of relying on the log line alone. Any other error (for example an
/// unrecognized fill type introduced by a mid-stream style change) aborts
/// the whole shape, since guessing at a malformed style table would be
/// worse than reporting it.
fn read_shape_records(reader: &mut Reader, mut ctx: ShapeContext) -> Result<(Vec<ShapeRecord>, bool)> {
    let mut records = Vec::new();
    loop {
        match read_shape_record(reader, &mut ctx) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => return Ok((records, false)),
            Err(Error::UnexpectedEndOfData { offset }) => {
                log::warn!(
                    "shape record stream truncated at offset {} after {} record(s); using partial shape",
                    offset,
                    records.len()
                );
                return Ok((records, true));
            }
            Err(e) => return Err(e),
        }
    }
}

fn decode_define_shape(body: &[u8], shape_version: u8) -> Result<Shape> {
    let mut reader = Reader::new(body);
    let id = reader.read_u16()?;
    let shape_bounds = reader.read_rectangle()?;
    let (edge_bounds, has_fill_winding_rule, has_non_scaling_strokes, has_scaling_strokes) =
        if shape_version >= 4 {
            let edge_bounds = reader.read_rectangle()?;
            let _reserved = reader.read_ubits(5)?;
            let has_fill_winding_rule = reader.read_bit()?;
            let has_non_scaling_strokes = reader.read_bit()?;
            let has_scaling_strokes = reader.read_bit()?;
            reader.align();
            (
                edge_bounds,
                has_fill_winding_rule,
                has_non_scaling_strokes,
                has_scaling_strokes,
            )
        } else {
            (shape_bounds.clone(), false, false, true)
        };

    let fill_styles = read_fill_style_list(&mut reader, shape_version)?;
    let line_styles = read_line_style_list(&mut reader, shape_version)?;
    let num_fill_bits = reader.read_ubits(4)? as u8;
    let num_line_bits = reader.read_ubits(4)? as u8;
    let ctx = ShapeContext {
        swf_version: 0,
        shape_version,
        num_fill_bits,
        num_line_bits,
    };
    let (shape, is_truncated) = read_shape_records(&mut reader, ctx)?;
    if is_truncated {
        log::warn!(
            "{}",
            TruncatedShape {
                id,
                records_decoded: shape.len(),
            }
        );
    }

    Ok(Shape {
        version: shape_version,
        id,
        shape_bounds,
        edge_bounds,
        has_fill_winding_rule,
        has_non_scaling_strokes,
        has_scaling_strokes,
        styles: ShapeStyles {
            fill_styles,
            line_styles,
        },
        shape,
        is_truncated,
    })
}

fn read_morph_gradient(reader: &mut Reader) -> Result<(Gradient, Gradient)> {
    let start_matrix = reader.read_matrix()?;
    let end_matrix = reader.read_matrix()?;
    reader.align();
    let spread = spread_from_bits(reader.read_ubits(2)?);
    let interpolation = interpolation_from_bits(reader.read_ubits(2)?);
    let num_records = reader.read_ubits(4)? as usize;
    let mut start_records = Vec::with_capacity(num_records);
    let mut end_records = Vec::with_capacity(num_records);
    for _ in 0..num_records {
        let start_ratio = reader.read_u8()?;
        let start_color = reader.read_rgba()?;
        let end_ratio = reader.read_u8()?;
        let end_color = reader.read_rgba()?;
        start_records.push(GradientRecord {
            ratio: start_ratio,
            color: start_color,
        });
        end_records.push(GradientRecord {
            ratio: end_ratio,
            color: end_color,
        });
    }
    Ok((
        Gradient {
            matrix: start_matrix,
            spread,
            interpolation,
            records: start_records,
        },
        Gradient {
            matrix: end_matrix,
            spread,
            interpolation,
            records: end_records,
        },
    ))
}

fn read_morph_fill_style(reader: &mut Reader) -> Result<(FillStyle, FillStyle)> {
    let offset = reader.pos();
    let fill_style_type = reader.read_u8()?;
    match fill_style_type {
        0x00 => {
            let start_color = reader.read_rgba()?;
            let end_color = reader.read_rgba()?;
            Ok((FillStyle::Color(start_color), FillStyle::Color(end_color)))
        }
        0x10 => {
            let (sg, eg) = read_morph_gradient(reader)?;
            Ok((FillStyle::LinearGradient(sg), FillStyle::LinearGradient(eg)))
        }
        0x12 => {
            let (sg, eg) = read_morph_gradient(reader)?;
            Ok((FillStyle::RadialGradient(sg), FillStyle::RadialGradient(eg)))
        }
        0x13 => {
            let (sg, eg) = read_morph_gradient(reader)?;
            let start_focal = reader.read_fixed8_8()?;
            let end_focal = reader.read_fixed8_8()?;
            Ok((
                FillStyle::FocalGradient {
                    gradient: sg,
                    focal_point: start_focal,
                },
                FillStyle::FocalGradient {
                    gradient: eg,
                    focal_point: end_focal,
                },
            ))
        }
        0x40 | 0x41 | 0x42 | 0x43 => {
            let id = reader.read_u16()?;
            let start_matrix = reader.read_matrix()?;
            let end_matrix = reader.read_matrix()?;
            let (is_repeating, is_smoothed) = bitmap_fill_flags(fill_style_type);
            Ok((
                FillStyle::Bitmap {
                    id,
                    matrix: start_matrix,
                    is_smoothed,
                    is_repeating,
                },
                FillStyle::Bitmap {
                    id,
                    matrix: end_matrix,
                    is_smoothed,
                    is_repeating,
                },
            ))
        }
        _ => Err(Error::UnknownFillType {
            value: fill_style_type,
            offset,
        }),
    }
}

fn read_morph_fill_style_list(reader: &mut Reader) -> Result<(Vec<FillStyle>, Vec<FillStyle>)> {
    // Morph shapes always use the DefineShape2+ style-count escape.
    let count = read_style_count(reader, 2)?;
    let mut start = Vec::with_capacity(count as usize);
    let mut end = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (s, e) = read_morph_fill_style(reader)?;
        start.push(s);
        end.push(e);
    }
    Ok((start, end))
}

fn read_morph_line_style_1(reader: &mut Reader) -> Result<(LineStyle, LineStyle)> {
    let start_width = Twips::new(i32::from(reader.read_u16()?));
    let end_width = Twips::new(i32::from(reader.read_u16()?));
    let start_color = reader.read_rgba()?;
    let end_color = reader.read_rgba()?;
    Ok((
        LineStyle::new_v1(start_width, start_color),
        LineStyle::new_v1(end_width, end_color),
    ))
}

fn read_morph_line_style_2(reader: &mut Reader) -> Result<(LineStyle, LineStyle)> {
    let start_width = Twips::new(i32::from(reader.read_u16()?));
    let end_width = Twips::new(i32::from(reader.read_u16()?));
    let start_cap = cap_style_from_bits(reader.read_ubits(2)?);
    let join_style_bits = reader.read_ubits(2)?;
    let has_fill = reader.read_bit()?;
    let allow_scale_x = !reader.read_bit()?;
    let allow_scale_y = !reader.read_bit()?;
    let is_pixel_hinted = reader.read_bit()?;
    let _reserved = reader.read_ubits(5)?;
    let allow_close = !reader.read_bit()?;
    let end_cap = cap_style_from_bits(reader.read_ubits(2)?);
    let join_style = match join_style_bits {
        1 => LineJoinStyle::Bevel,
        2 => LineJoinStyle::Miter(reader.read_fixed8_8()?),
        _ => LineJoinStyle::Round,
    };
    let (start_color, end_color, start_fill, end_fill) = if has_fill {
        let (s, e) = read_morph_fill_style(reader)?;
        (Color::default(), Color::default(), Some(s), Some(e))
    } else {
        (reader.read_rgba()?, reader.read_rgba()?, None, None)
    };
    let start = LineStyle {
        width: start_width,
        color: start_color,
        start_cap,
        end_cap,
        join_style,
        fill_style: start_fill,
        allow_scale_x,
        allow_scale_y,
        is_pixel_hinted,
        allow_close,
    };
    let end = LineStyle {
        width: end_width,
        color: end_color,
        start_cap,
        end_cap,
        join_style,
        fill_style: end_fill,
        allow_scale_x,
        allow_scale_y,
        is_pixel_hinted,
        allow_close,
    };
    Ok((start, end))
}

fn read_morph_line_style_list(
    reader: &mut Reader,
    morph_version: u8,
) -> Result<(Vec<LineStyle>, Vec<LineStyle>)> {
    let count = read_style_count(reader, 2)?;
    let mut start = Vec::with_capacity(count as usize);
    let mut end = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (s, e) = if morph_version >= 2 {
            read_morph_line_style_2(reader)?
        } else {
            read_morph_line_style_1(reader)?
        };
        start.push(s);
        end.push(e);
    }
    Ok((start, end))
}

/// A start/end shape record pair matches topologically if they're the same
/// record kind; the coordinates and style indices inside are free to differ.
fn records_match_topology(a: &ShapeRecord, b: &ShapeRecord) -> bool {
    matches!(
        (a, b),
        (ShapeRecord::StyleChange(_), ShapeRecord::StyleChange(_))
            | (ShapeRecord::StraightEdge { .. }, ShapeRecord::StraightEdge { .. })
            | (ShapeRecord::CurvedEdge { .. }, ShapeRecord::CurvedEdge { .. })
    )
}

fn decode_define_morph_shape(body: &[u8], morph_version: u8) -> Result<DefineMorphShape> {
    let mut reader = Reader::new(body);
    let id = reader.read_u16()?;
    let start_bounds = reader.read_rectangle()?;
    let end_bounds = reader.read_rectangle()?;
    let (start_edge_bounds, end_edge_bounds, has_non_scaling_strokes, has_scaling_strokes) =
        if morph_version >= 2 {
            let start_edge_bounds = reader.read_rectangle()?;
            let end_edge_bounds = reader.read_rectangle()?;
            let _reserved = reader.read_ubits(6)?;
            let has_non_scaling_strokes = reader.read_bit()?;
            let has_scaling_strokes = reader.read_bit()?;
            (
                start_edge_bounds,
                end_edge_bounds,
                has_non_scaling_strokes,
                has_scaling_strokes,
            )
        } else {
            (start_bounds.clone(), end_bounds.clone(), false, true)
        };
    reader.align();

    let offset_to_end_edges = reader.read_u32()?;
    let offset_base = reader.pos();

    let (start_fill_styles, end_fill_styles) = read_morph_fill_style_list(&mut reader)?;
    let (start_line_styles, end_line_styles) = read_morph_line_style_list(&mut reader, morph_version)?;
    let num_fill_bits = reader.read_ubits(4)? as u8;
    let num_line_bits = reader.read_ubits(4)? as u8;
    // Morph fill/line style records always carry RGBA colors.
    let shape_version = if morph_version >= 2 { 4 } else { 3 };
    let start_ctx = ShapeContext {
        swf_version: 0,
        shape_version,
        num_fill_bits,
        num_line_bits,
    };
    let (start_shape, start_truncated) = read_shape_records(&mut reader, start_ctx)?;

    let end_offset = offset_base
        .checked_add(offset_to_end_edges as usize)
        .filter(|&o| o <= body.len())
        .ok_or(Error::UnexpectedEndOfData { offset: offset_base })?;
    let mut end_reader = Reader::new(body);
    end_reader.seek_to(end_offset);
    // EndEdges is itself a SHAPE, which opens with its own NumFillBits(UB[4])
    // and NumLineBits(UB[4]) before the record stream — the same 8 bits
    // `num_fill_bits`/`num_line_bits` above were read from for StartEdges.
    end_reader.read_ubits(8)?;
    let end_ctx = ShapeContext {
        swf_version: 0,
        shape_version,
        num_fill_bits,
        num_line_bits,
    };
    let (end_shape, end_truncated) = read_shape_records(&mut end_reader, end_ctx)?;

    if start_shape.len() != end_shape.len()
        || start_shape
            .iter()
            .zip(end_shape.iter())
            .any(|(s, e)| !records_match_topology(s, e))
    {
        return Err(Error::MorphTopologyMismatch {
            start_count: start_shape.len(),
            end_count: end_shape.len(),
        });
    }

    if start_truncated {
        log::warn!(
            "{}",
            TruncatedShape {
                id,
                records_decoded: start_shape.len(),
            }
        );
    }
    if end_truncated {
        log::warn!(
            "{}",
            TruncatedShape {
                id,
                records_decoded: end_shape.len(),
            }
        );
    }

    Ok(DefineMorphShape {
        version: morph_version,
        id,
        has_non_scaling_strokes,
        has_scaling_strokes,
        start: MorphShape {
            shape_bounds: start_bounds,
            edge_bounds: start_edge_bounds,
            fill_styles: start_fill_styles,
            line_styles: start_line_styles,
            shape: start_shape,
            is_truncated: start_truncated,
        },
        end: MorphShape {
            shape_bounds: end_bounds,
            edge_bounds: end_edge_bounds,
            fill_styles: end_fill_styles,
            line_styles: end_line_styles,
            shape: end_shape,
            is_truncated: end_truncated,
        },
    })
}

/// A cursor over a byte slice supporting both byte-granular and MSB-first
/// bit-packed reads.
///
/// Any byte-granular read (`read_u8`, `read_u16`, ...) implicitly aligns to
/// the next byte boundary first, discarding any partially-consumed bits.
/// Bit reads (`read_bit`, `read_ubits`, `read_sbits`) do not align; callers
/// that need byte alignment after a run of bit fields call [`align`](Reader::align)
/// explicitly.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    bit_pos: u8,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            bit_pos: 0,
        }
    }

    /// The current byte offset, counting a partially-consumed byte as not
    /// yet passed.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn bytes_remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn seek_to(&mut self, pos: usize) {
        self.pos = pos;
        self.bit_pos = 0;
    }

    fn require(&self, n: usize) -> Result<()> {
        if self.pos.saturating_add(n) > self.data.len() {
            Err(Error::UnexpectedEndOfData { offset: self.pos })
        } else {
            Ok(())
        }
    }

    /// Discards any partially-read bits, moving to the start of the next byte.
    pub fn align(&mut self) {
        if self.bit_pos != 0 {
            self.bit_pos = 0;
            self.pos += 1;
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.align();
        self.require(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.align();
        self.require(2)?;
        let v = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.align();
        self.require(2)?;
        let v = LittleEndian::read_i16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.align();
        self.require(4)?;
        let v = LittleEndian::read_u32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.align();
        self.require(4)?;
        let v = LittleEndian::read_i32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.align();
        self.require(4)?;
        let v = LittleEndian::read_f32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    /// 16.16 fixed-point, as used by `MATRIX` scale/rotate terms.
    pub fn read_fixed16_16(&mut self) -> Result<f32> {
        Ok(self.read_i32()? as f32 / 65536.0)
    }

    /// 8.8 fixed-point, as used by the header's frame rate.
    pub fn read_fixed8_8(&mut self) -> Result<f32> {
        Ok(f32::from(self.read_i16()?) / 256.0)
    }

    /// A base-128 varint: each byte's low 7 bits contribute to the result,
    /// the high bit signals another byte follows. Fails if the 5th byte
    /// still sets the continuation bit.
    pub fn read_encoded_u32(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut result: u32 = 0;
        for i in 0..5u32 {
            let byte = self.read_u8()?;
            result |= u32::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            if i == 4 {
                return Err(Error::InvalidEncodedU32 { offset: start });
            }
        }
        unreachable!()
    }

    /// A null-terminated, byte-aligned string up to 64KiB long.
    pub fn read_str(&mut self) -> Result<&'a SwfStr> {
        self.align();
        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && self.data[end] != 0 {
            end += 1;
            if end - start > 65536 {
                return Err(Error::StringTooLong { offset: start });
            }
        }
        if end >= self.data.len() {
            return Err(Error::UnexpectedEndOfData { offset: end });
        }
        self.pos = end + 1;
        Ok(SwfStr::from_bytes(&self.data[start..end]))
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        self.require(1)?;
        let byte = self.data[self.pos];
        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.pos += 1;
        }
        Ok(bit != 0)
    }

    /// Reads `n` bits (0..=32) MSB-first, accumulating them into an unsigned
    /// integer most-significant-bit first.
    pub fn read_ubits(&mut self, n: u32) -> Result<u32> {
        let mut val: u32 = 0;
        for _ in 0..n {
            val = (val << 1) | u32::from(self.read_bit()?);
        }
        Ok(val)
    }

    /// Reads `n` bits (0..=32) as a two's-complement signed integer.
    pub fn read_sbits(&mut self, n: u32) -> Result<i32> {
        if n == 0 {
            return Ok(0);
        }
        let uval = self.read_ubits(n)?;
        let sign_bit = 1u32 << (n - 1);
        if uval & sign_bit != 0 {
            Ok((uval as i32).wrapping_sub(1i32 << n))
        } else {
            Ok(uval as i32)
        }
    }

    /// `RECT`: a 5-bit field width followed by four signed fields of that
    /// width (xMin, xMax, yMin, yMax). Leaves the cursor unaligned.
    pub fn read_rectangle(&mut self) -> Result<Rectangle> {
        self.align();
        let num_bits = self.read_ubits(5)?;
        let x_min = Twips::new(self.read_sbits(num_bits)?);
        let x_max = Twips::new(self.read_sbits(num_bits)?);
        let y_min = Twips::new(self.read_sbits(num_bits)?);
        let y_max = Twips::new(self.read_sbits(num_bits)?);
        Ok(Rectangle {
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// `MATRIX`: optional scale terms, optional rotate/skew terms, then
    /// mandatory translate terms. Aligns on entry and exit.
    pub fn read_matrix(&mut self) -> Result<Matrix> {
        self.align();
        let mut matrix = Matrix::IDENTITY;
        if self.read_bit()? {
            let num_bits = self.read_ubits(5)?;
            matrix.a = self.read_sbits(num_bits)? as f32 / 65536.0;
            matrix.d = self.read_sbits(num_bits)? as f32 / 65536.0;
        }
        if self.read_bit()? {
            let num_bits = self.read_ubits(5)?;
            matrix.b = self.read_sbits(num_bits)? as f32 / 65536.0;
            matrix.c = self.read_sbits(num_bits)? as f32 / 65536.0;
        }
        let num_bits = self.read_ubits(5)?;
        matrix.tx = Twips::new(self.read_sbits(num_bits)?);
        matrix.ty = Twips::new(self.read_sbits(num_bits)?);
        self.align();
        Ok(matrix)
    }

    /// `CXFORM`/`CXFORMWITHALPHA`: optional add terms, optional multiply
    /// terms, sharing one field width. Aligns on entry and exit.
    fn read_color_transform_impl(&mut self, has_alpha: bool) -> Result<ColorTransform> {
        self.align();
        let mut transform = ColorTransform::new();
        let has_add = self.read_bit()?;
        let has_mult = self.read_bit()?;
        let num_bits = self.read_ubits(4)?;
        if has_mult {
            transform.r_multiply = self.read_sbits(num_bits)? as f32 / 256.0;
            transform.g_multiply = self.read_sbits(num_bits)? as f32 / 256.0;
            transform.b_multiply = self.read_sbits(num_bits)? as f32 / 256.0;
            if has_alpha {
                transform.a_multiply = self.read_sbits(num_bits)? as f32 / 256.0;
            }
        }
        if has_add {
            transform.r_add = self.read_sbits(num_bits)? as i16;
            transform.g_add = self.read_sbits(num_bits)? as i16;
            transform.b_add = self.read_sbits(num_bits)? as i16;
            if has_alpha {
                transform.a_add = self.read_sbits(num_bits)? as i16;
            }
        }
        self.align();
        Ok(transform)
    }

    pub fn read_color_transform(&mut self) -> Result<ColorTransform> {
        self.read_color_transform_impl(true)
    }

    pub fn read_color_transform_no_alpha(&mut self) -> Result<ColorTransform> {
        self.read_color_transform_impl(false)
    }

    pub fn read_rgb(&mut self) -> Result<Color> {
        let r = self.read_u8()?;
        let g = self.read_u8()?;
        let b = self.read_u8()?;
        Ok(Color { r, g, b, a: 255 })
    }

    pub fn read_rgba(&mut self) -> Result<Color> {
        let r = self.read_u8()?;
        let g = self.read_u8()?;
        let b = self.read_u8()?;
        let a = self.read_u8()?;
        Ok(Color { r, g, b, a })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ubits_is_msb_first() {
        // 1011_0000 read 4 bits at a time.
        let data = [0b1011_0000];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_ubits(4).unwrap(), 0b1011);
        assert_eq!(reader.read_ubits(4).unwrap(), 0b0000);
    }

    #[test]
    fn sbits_sign_extends() {
        let data = [0b1000_0011, 0b1100_0000];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_sbits(5).unwrap(), -16);
        assert_eq!(reader.read_sbits(5).unwrap(), 15);
    }

    #[test]
    fn encoded_u32_multi_byte() {
        let data = [0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_encoded_u32().unwrap(), 0xffff_ffff);
    }

    #[test]
    fn encoded_u32_rejects_unterminated_fifth_byte() {
        let data = [0xff, 0xff, 0xff, 0xff, 0xff];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_encoded_u32(),
            Err(Error::InvalidEncodedU32 { .. })
        ));
    }

    #[test]
    fn byte_read_aligns_first() {
        let data = [0b1000_0000, 0x42];
        let mut reader = Reader::new(&data);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_u8().unwrap(), 0x42);
    }

    #[test]
    fn rectangle_round_trip_bit_width() {
        // nbits=5, then four 5-bit fields: 1, -1, 2, -2.
        let mut data = [0u8; 4];
        {
            // Hand-assemble: 00101 00001 11111 00010 11110 + padding.
            let bits: &[(u32, u32)] = &[(5, 5), (5, 1), (5, 0x1f), (5, 2), (5, 0x1e)];
            let mut acc: u64 = 0;
            let mut total = 0;
            for &(width, value) in bits {
                acc = (acc << width) | u64::from(value);
                total += width;
            }
            acc <<= 32 - total;
            data.copy_from_slice(&(acc as u32).to_be_bytes());
        }
        let mut reader = Reader::new(&data);
        let rect = reader.read_rectangle().unwrap();
        assert_eq!(rect.x_min.get(), 1);
        assert_eq!(rect.x_max.get(), -1);
        assert_eq!(rect.y_min.get(), 2);
        assert_eq!(rect.y_max.get(), -2);
    }

    #[test]
    fn tag_framer_stops_at_end_tag() {
        // ShowFrame (code 1, len 0), End (code 0, len 0).
        let data = [0b0100_0000, 0b0000_0000, 0, 0];
        let tags: Vec<_> = TagFramer::new(&data).collect();
        assert_eq!(tags.len(), 2);
        let (code0, _, _) = tags[0].as_ref().unwrap();
        assert_eq!(*code0, 1);
        let (code1, _, _) = tags[1].as_ref().unwrap();
        assert_eq!(*code1, 0);
    }

    #[test]
    fn tag_framer_reports_truncated_tag() {
        // code 2 (DefineShape), short length 10, but 0 bytes follow.
        let header: u16 = (2 << 6) | 10;
        let data = header.to_le_bytes();
        let mut framer = TagFramer::new(&data);
        match framer.next() {
            Some(Err(Error::TruncatedTag { code, requested, available })) => {
                assert_eq!(code, 2);
                assert_eq!(requested, 10);
                assert_eq!(available, 0);
            }
            other => panic!("expected TruncatedTag, got {:?}", other),
        }
    }

    #[test]
    fn shape1_fill_style_count_0xff_is_255_not_escape() {
        // A lone 0xff byte is the whole fill style list header for Shape1;
        // 255 styles would follow (we only assert the count, not the bytes).
        let data = [0xffu8];
        let mut reader = Reader::new(&data);
        assert_eq!(read_style_count(&mut reader, 1).unwrap(), 255);
    }

    #[test]
    fn shape2_fill_style_count_0xff_escapes_to_u16() {
        let data = [0xffu8, 0x00, 0x01]; // 0x0100 = 256
        let mut reader = Reader::new(&data);
        assert_eq!(read_style_count(&mut reader, 2).unwrap(), 256);
    }

    /// Minimal MSB-first bit writer, the inverse of `Reader::read_ubits`,
    /// used only to hand-assemble fixtures for round-trip tests.
    struct BitWriter {
        bytes: Vec<u8>,
        bit_pos: u32,
    }

    impl BitWriter {
        fn new() -> Self {
            Self {
                bytes: Vec::new(),
                bit_pos: 0,
            }
        }

        fn write_bits(&mut self, value: u32, n: u32) {
            for i in (0..n).rev() {
                let bit = (value >> i) & 1;
                if self.bit_pos == 0 {
                    self.bytes.push(0);
                }
                let byte = self.bytes.last_mut().unwrap();
                *byte |= (bit as u8) << (7 - self.bit_pos);
                self.bit_pos = (self.bit_pos + 1) % 8;
            }
        }

        fn finish(self) -> Vec<u8> {
            self.bytes
        }
    }

    #[test]
    fn rect_round_trips_across_every_field_width() {
        for n_bits in [0u32, 1, 5, 17, 31] {
            let mut writer = BitWriter::new();
            writer.write_bits(n_bits, 5);
            let mask = if n_bits == 0 {
                0
            } else {
                (1u64 << n_bits) as u32 - 1
            };
            let values: [i32; 4] = if n_bits == 0 {
                [0, 0, 0, 0]
            } else {
                let max = (1i64 << (n_bits - 1)) - 1;
                let min = -(1i64 << (n_bits - 1));
                [min as i32, max as i32, min as i32, max as i32]
            };
            for &value in &values {
                writer.write_bits(value as u32 & mask, n_bits);
            }

            let data = writer.finish();
            let mut reader = Reader::new(&data);
            let rect = reader.read_rectangle().unwrap();

            assert_eq!(rect.x_min.get(), values[0]);
            assert_eq!(rect.x_max.get(), values[1]);
            assert_eq!(rect.y_min.get(), values[2]);
            assert_eq!(rect.y_max.get(), values[3]);
        }
    }

    #[test]
    fn matrix_round_trips_every_scale_rotate_combination() {
        for (has_scale, has_rotate) in [(false, false), (true, false), (false, true), (true, true)] {
            let mut writer = BitWriter::new();
            writer.write_bits(has_scale as u32, 1);
            if has_scale {
                writer.write_bits(20, 5); // num_bits
                writer.write_bits((1.5_f32 * 65536.0) as i32 as u32 & 0xfffff, 20);
                writer.write_bits((2.25_f32 * 65536.0) as i32 as u32 & 0xfffff, 20);
            }
            writer.write_bits(has_rotate as u32, 1);
            if has_rotate {
                writer.write_bits(18, 5);
                writer.write_bits((0.5_f32 * 65536.0) as i32 as u32 & 0x3ffff, 18);
                writer.write_bits((-0.5_f32 * 65536.0) as i32 as u32 & 0x3ffff, 18);
            }
            writer.write_bits(17, 5); // translate num_bits
            writer.write_bits(1000i32 as u32 & 0x1ffff, 17);
            writer.write_bits((-1000i32) as u32 & 0x1ffff, 17);

            let data = writer.finish();
            let mut reader = Reader::new(&data);
            let matrix = reader.read_matrix().unwrap();

            if has_scale {
                approx::assert_relative_eq!(matrix.a, 1.5, epsilon = 0.001);
                approx::assert_relative_eq!(matrix.d, 2.25, epsilon = 0.001);
            } else {
                assert_eq!(matrix.a, 1.0);
                assert_eq!(matrix.d, 1.0);
            }
            if has_rotate {
                approx::assert_relative_eq!(matrix.b, 0.5, epsilon = 0.001);
                approx::assert_relative_eq!(matrix.c, -0.5, epsilon = 0.001);
            } else {
                assert_eq!(matrix.b, 0.0);
                assert_eq!(matrix.c, 0.0);
            }
            assert_eq!(matrix.tx.get(), 1000);
            assert_eq!(matrix.ty.get(), -1000);
        }
    }

    #[test]
    fn bad_signature_is_rejected() {
        struct NoopInflate;
        impl Inflate for NoopInflate {
            fn inflate(&self, _c: Compression, _i: &[u8]) -> std::result::Result<Vec<u8>, String> {
                Ok(Vec::new())
            }
        }
        let data = b"BAD\x06\0\0\0\0";
        let result = decompress_swf(data, &NoopInflate);
        assert!(matches!(result, Err(Error::BadSignature { .. })));
    }

    #[test]
    fn define_shape_truncated_record_stream_is_reported_and_partial() {
        // id, RECT(nbits=0), zero fill styles, zero line styles,
        // numFillBits/numLineBits = 0, then nothing: the first shape record
        // read starts mid-stream with no bytes left.
        let mut body = 1u16.to_le_bytes().to_vec();
        body.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        let shape = decode_define_shape(&body, 1).unwrap();
        assert!(shape.is_truncated);
        assert!(shape.shape.is_empty());
    }

    /// Builds a minimal `DefineMorphShape` body with empty start/end fill
    /// and line style lists and empty start/end shape record streams, to
    /// exercise the `offsetToEndEdges` jump without any other moving parts.
    fn empty_morph_shape_body(id: u16) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 5); // start RECT nbits = 0
        writer.write_bits(0, 5); // end RECT nbits = 0
        let mut body = id.to_le_bytes().to_vec();
        body.extend_from_slice(&writer.finish()); // aligned by `reader.align()`

        body.extend_from_slice(&4u32.to_le_bytes()); // offsetToEndEdges
        body.push(0x00); // start fill style count
        body.push(0x00); // start line style count
        body.push(0x00); // start NumFillBits/NumLineBits
        body.push(0x00); // start end-of-shape marker

        // EndEdges begins here, offsetToEndEdges (4) bytes past offset_base.
        body.push(0x00); // end NumFillBits/NumLineBits
        body.push(0x00); // end end-of-shape marker
        body
    }

    #[test]
    fn morph_shape_end_edges_header_bits_are_consumed_before_records() {
        let body = empty_morph_shape_body(1);
        let morph = decode_define_morph_shape(&body, 1).unwrap();
        assert!(morph.start.shape.is_empty());
        assert!(morph.end.shape.is_empty());
        assert!(!morph.start.is_truncated);
        assert!(!morph.end.is_truncated);
    }
}
