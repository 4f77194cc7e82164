//! The depth-indexed mapping of active placed instances.
//!
//! A display list never resolves character ids to their definitions; that
//! lookup happens at the render boundary through the [`CharacterLibrary`](
//! crate::character::CharacterLibrary). The list only tracks *which*
//! character sits at each depth and with what transform.

use crate::error::DisplayListError;
use std::collections::BTreeMap;
use swf::{BlendMode, CharacterId, Color, ColorTransform, Depth, Filter, Matrix, PlaceObjectAction};

/// Everything a `PlaceObject{,2,3}` tag can carry. `None` fields are
/// "not present in this tag" rather than "reset to a default": a `Modify`
/// action only touches the fields that are `Some`.
#[derive(Debug, Clone)]
pub struct PlaceObjectData {
    pub depth: Depth,
    pub action: PlaceObjectAction,
    pub matrix: Option<Matrix>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<Depth>,
    pub blend_mode: Option<BlendMode>,
    pub filters: Option<Vec<Filter>>,
    pub is_visible: Option<bool>,
}

impl PlaceObjectData {
    pub(crate) fn from_swf(place: swf::PlaceObject, swf_version: u8) -> Self {
        Self {
            depth: place.depth,
            action: place.action,
            matrix: place.matrix,
            color_transform: place.color_transform,
            ratio: place.ratio,
            name: place
                .name
                .map(|name| name.to_str_lossy(swf_version).into_owned()),
            clip_depth: place.clip_depth,
            blend_mode: place.blend_mode,
            filters: place.filters,
            is_visible: place.is_visible,
        }
    }
}

/// An active appearance of a character on the display list, pinned at a
/// depth. Holds only the character's id (a weak reference); resolving it
/// to a `Shape`/`Sprite` is the renderer's job.
#[derive(Debug, Clone)]
pub struct PlacedObject {
    pub character_id: CharacterId,
    pub depth: Depth,
    pub matrix: Matrix,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<Depth>,
    pub is_visible: bool,
    pub blend_mode: BlendMode,
    pub filters: Vec<Filter>,
}

impl PlacedObject {
    fn new(character_id: CharacterId, data: &PlaceObjectData) -> Self {
        Self {
            character_id,
            depth: data.depth,
            matrix: data.matrix.unwrap_or(Matrix::IDENTITY),
            color_transform: data.color_transform.clone(),
            ratio: data.ratio,
            name: data.name.clone(),
            clip_depth: data.clip_depth,
            is_visible: data.is_visible.unwrap_or(true),
            blend_mode: data.blend_mode.unwrap_or(BlendMode::Normal),
            filters: data.filters.clone().unwrap_or_default(),
        }
    }

    fn modify(&mut self, data: &PlaceObjectData) {
        if let Some(matrix) = data.matrix {
            self.matrix = matrix;
        }
        if let Some(color_transform) = &data.color_transform {
            self.color_transform = Some(color_transform.clone());
        }
        if let Some(ratio) = data.ratio {
            self.ratio = Some(ratio);
        }
        if let Some(name) = &data.name {
            self.name = Some(name.clone());
        }
        if let Some(clip_depth) = data.clip_depth {
            self.clip_depth = Some(clip_depth);
        }
        if let Some(is_visible) = data.is_visible {
            self.is_visible = is_visible;
        }
        if let Some(blend_mode) = data.blend_mode {
            self.blend_mode = blend_mode;
        }
        if let Some(filters) = &data.filters {
            self.filters = filters.clone();
        }
    }
}

/// A depth-indexed mapping of active placed instances. At most one object
/// per depth; a `BTreeMap` keeps `objects_in_render_order` a plain
/// in-order traversal rather than a sort.
#[derive(Debug, Default)]
pub struct DisplayList {
    objects: BTreeMap<Depth, PlacedObject>,
    background_color: Option<Color>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            background_color: None,
        }
    }

    /// Applies a `PlaceObject` action. `Place`/`Replace` create or
    /// overwrite the instance at `data.depth` outright; `Modify` updates
    /// only the fields present in `data` and fails if nothing is placed at
    /// that depth yet.
    pub fn place(&mut self, data: &PlaceObjectData) -> Result<(), DisplayListError> {
        match data.action {
            PlaceObjectAction::Place(id) | PlaceObjectAction::Replace(id) => {
                self.objects.insert(data.depth, PlacedObject::new(id, data));
                Ok(())
            }
            PlaceObjectAction::Modify => match self.objects.get_mut(&data.depth) {
                Some(object) => {
                    object.modify(data);
                    Ok(())
                }
                None => Err(DisplayListError::ModifyMissingDepth { depth: data.depth }),
            },
        }
    }

    /// Deletes the object at `depth`. Removing an already-empty depth is
    /// not an error: SWF files do remove non-existent depths.
    pub fn remove(&mut self, depth: Depth) {
        self.objects.remove(&depth);
    }

    pub fn get(&self, depth: Depth) -> Option<&PlacedObject> {
        self.objects.get(&depth)
    }

    /// The active instances in ascending-depth (back-to-front) render order.
    pub fn objects_in_render_order(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn background_color(&self) -> Option<Color> {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = Some(color);
    }

    /// Resets to the empty display list with no background color, as if
    /// no frame had ever executed. Used when a backward seek requires a
    /// full replay from frame 0.
    pub(crate) fn clear(&mut self) {
        self.objects.clear();
        self.background_color = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place_at(depth: Depth, action: PlaceObjectAction, matrix: Option<Matrix>) -> PlaceObjectData {
        PlaceObjectData {
            depth,
            action,
            matrix,
            color_transform: None,
            ratio: None,
            name: None,
            clip_depth: None,
            blend_mode: None,
            filters: None,
            is_visible: None,
        }
    }

    #[test]
    fn place_creates_a_new_instance() {
        let mut list = DisplayList::new();
        list.place(&place_at(1, PlaceObjectAction::Place(7), None))
            .unwrap();
        let object = list.get(1).unwrap();
        assert_eq!(object.character_id, 7);
        assert_eq!(object.matrix, Matrix::IDENTITY);
    }

    #[test]
    fn modify_without_existing_object_fails() {
        let mut list = DisplayList::new();
        let result = list.place(&place_at(1, PlaceObjectAction::Modify, None));
        assert_eq!(
            result,
            Err(DisplayListError::ModifyMissingDepth { depth: 1 })
        );
    }

    #[test]
    fn modify_only_touches_present_fields() {
        let mut list = DisplayList::new();
        list.place(&place_at(
            1,
            PlaceObjectAction::Place(1),
            Some(Matrix::translate(swf::Twips::new(0), swf::Twips::new(0))),
        ))
        .unwrap();
        list.place(&place_at(
            1,
            PlaceObjectAction::Modify,
            Some(Matrix::translate(swf::Twips::new(100), swf::Twips::new(0))),
        ))
        .unwrap();
        let object = list.get(1).unwrap();
        assert_eq!(object.character_id, 1);
        assert_eq!(object.matrix.tx.get(), 100);
    }

    #[test]
    fn remove_is_a_no_op_on_an_empty_depth() {
        let mut list = DisplayList::new();
        list.remove(42);
        assert!(list.is_empty());
    }

    #[test]
    fn objects_in_render_order_is_ascending_by_depth() {
        let mut list = DisplayList::new();
        list.place(&place_at(5, PlaceObjectAction::Place(1), None))
            .unwrap();
        list.place(&place_at(1, PlaceObjectAction::Place(2), None))
            .unwrap();
        list.place(&place_at(3, PlaceObjectAction::Place(3), None))
            .unwrap();
        let depths: Vec<Depth> = list.objects_in_render_order().map(|o| o.depth).collect();
        assert_eq!(depths, vec![1, 3, 5]);
    }
}
