//! The document-wide dictionary of decoded definitions, keyed by character id.
//!
//! A [`Character`] is either a directly-rendered shape or a sub-timeline
//! (a sprite). Ids are assigned by the SWF author and are unique within a
//! document; [`CharacterLibrary::define`] enforces that at the point of
//! definition.

use crate::error::DuplicateCharacterId;
use crate::timeline::Timeline;
use fnv::FnvHashMap;
use std::rc::Rc;
use swf::CharacterId;

/// A decoded definition, reachable by id from a [`CharacterLibrary`].
#[derive(Debug)]
pub enum Character {
    Shape(swf::Shape),
    MorphShape(swf::DefineMorphShape),
    /// A `DefineSprite`'s nested tag stream, already decoded into its own
    /// [`Timeline`]. The sprite's display list is independent of whatever
    /// document or sprite places it.
    Sprite(Timeline),
}

impl Character {
    pub fn as_shape(&self) -> Option<&swf::Shape> {
        match self {
            Character::Shape(shape) => Some(shape),
            _ => None,
        }
    }

    pub fn as_morph_shape(&self) -> Option<&swf::DefineMorphShape> {
        match self {
            Character::MorphShape(morph) => Some(morph),
            _ => None,
        }
    }

    pub fn as_sprite(&self) -> Option<&Timeline> {
        match self {
            Character::Sprite(timeline) => Some(timeline),
            _ => None,
        }
    }

    /// `true` if this character's shape data (or, for a morph shape,
    /// either half of it) decoded from a truncated record stream.
    pub fn is_truncated(&self) -> bool {
        match self {
            Character::Shape(shape) => shape.is_truncated,
            Character::MorphShape(morph) => morph.start.is_truncated || morph.end.is_truncated,
            Character::Sprite(_) => false,
        }
    }
}

/// A write-once-per-id dictionary of [`Character`]s.
///
/// Placed instances never own a `Character` directly; they hold a weak
/// reference (just the id) and resolve it through this table at lookup
/// time, so that removing an instance from a display list never affects
/// the definition it pointed to.
#[derive(Debug, Default)]
pub struct CharacterLibrary {
    characters: FnvHashMap<CharacterId, Rc<Character>>,
}

impl CharacterLibrary {
    pub fn new() -> Self {
        Self {
            characters: FnvHashMap::default(),
        }
    }

    /// Inserts `character` under `id`. Fails without modifying the library
    /// if `id` is already defined; callers that want to tolerate malformed
    /// input with duplicate ids should log [`DuplicateCharacterId`] and
    /// keep the first definition, per the format's "ids are unique per
    /// file" invariant.
    pub fn define(
        &mut self,
        id: CharacterId,
        character: Rc<Character>,
    ) -> Result<(), DuplicateCharacterId> {
        if self.characters.contains_key(&id) {
            return Err(DuplicateCharacterId { id });
        }
        self.characters.insert(id, character);
        Ok(())
    }

    pub fn get(&self, id: CharacterId) -> Option<&Rc<Character>> {
        self.characters.get(&id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(id: CharacterId) -> Rc<Character> {
        Rc::new(Character::Shape(swf::Shape {
            version: 1,
            id,
            shape_bounds: Default::default(),
            edge_bounds: Default::default(),
            has_fill_winding_rule: false,
            has_non_scaling_strokes: false,
            has_scaling_strokes: false,
            styles: swf::ShapeStyles {
                fill_styles: Vec::new(),
                line_styles: Vec::new(),
            },
            shape: Vec::new(),
            is_truncated: false,
        }))
    }

    #[test]
    fn define_then_get_round_trips() {
        let mut library = CharacterLibrary::new();
        library.define(1, shape(1)).unwrap();
        assert!(library.get(1).unwrap().as_shape().is_some());
        assert!(library.get(2).is_none());
    }

    #[test]
    fn redefining_an_id_is_rejected() {
        let mut library = CharacterLibrary::new();
        library.define(1, shape(1)).unwrap();
        let err = library.define(1, shape(1)).unwrap_err();
        assert_eq!(err, DuplicateCharacterId { id: 1 });
        // The first definition is kept.
        assert_eq!(library.len(), 1);
    }
}
