use num_derive::FromPrimitive;

/// The numeric tag codes this crate has a decoder for. Any other code is
/// framed but passed through as `Tag::Unknown`.
///
/// [SWF19 pp.24-25](https://www.adobe.com/content/dam/acom/en/devnet/pdf/swf-file-format-spec.pdf#page=26)
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
pub enum TagCode {
    End = 0,
    ShowFrame = 1,
    DefineShape = 2,
    PlaceObject = 4,
    RemoveObject = 5,
    SetBackgroundColor = 9,
    DefineShape2 = 22,
    PlaceObject2 = 26,
    RemoveObject2 = 28,
    DefineShape3 = 32,
    DefineSprite = 39,
    DefineMorphShape = 46,
    PlaceObject3 = 70,
    DefineShape4 = 83,
    DefineMorphShape2 = 84,
}
