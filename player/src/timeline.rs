//! The deterministic frame-action replay engine.
//!
//! A [`Timeline`] is an ordered list of [`Frame`]s, each a list of
//! [`FrameAction`]s recorded once at decode time. [`Timeline::seek`] turns
//! that prefix of actions into the current [`DisplayList`]; it never
//! re-decodes anything, so seeking is just deterministic replay.

use crate::character::Character;
use crate::display_list::{DisplayList, PlaceObjectData};
use crate::error::DisplayListError;
use std::rc::Rc;
use swf::{CharacterId, Color, Depth};

/// One action recorded against a frame, in declaration order.
///
/// `DefineCharacter` actions carry the character they define purely for
/// fidelity to the original tag stream; the character itself is already
/// resolvable through the document's `CharacterLibrary` (populated once,
/// at decode time), so replaying this action is a no-op — which is what
/// makes it safe to execute idempotently on every backward-seek replay.
#[derive(Debug, Clone)]
pub enum FrameAction {
    DefineCharacter {
        id: CharacterId,
        character: Rc<Character>,
    },
    PlaceObject(PlaceObjectData),
    RemoveObject {
        depth: Depth,
    },
    SetBackgroundColor(Color),
}

/// An ordered list of actions executed between two `ShowFrame` boundaries.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub actions: Vec<FrameAction>,
}

/// A sequence of frames plus the display list produced by executing the
/// prefix `[0..=current_frame]`.
///
/// `current_frame == -1` means no frame has executed yet: the initial
/// state, and the state after a `seek` past the start of the movie.
#[derive(Debug)]
pub struct Timeline {
    frames: Vec<Frame>,
    current_frame: i32,
    display_list: DisplayList,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            current_frame: -1,
            display_list: DisplayList::new(),
        }
    }

    /// Appends a frame. Builder-only: used while decoding, never during
    /// playback.
    pub fn add_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display_list
    }

    pub fn background_color(&self) -> Option<Color> {
        self.display_list.background_color()
    }

    /// Moves the playhead to `target`, replaying only the frames between
    /// the current position and the target.
    ///
    /// Out-of-range targets are a no-op. A backward seek (`target <
    /// current_frame`) resets the display list and replays from frame 0,
    /// since frame state is a pure function of its action prefix and isn't
    /// snapshotted. Returns any [`DisplayListError`]s hit along the way;
    /// each is logged and the offending action is skipped, so a single bad
    /// `Modify` never aborts the rest of the seek.
    pub fn seek(&mut self, target: i32) -> Vec<DisplayListError> {
        if target < 0 || target as usize >= self.frames.len() {
            return Vec::new();
        }
        if target < self.current_frame {
            self.display_list.clear();
            self.current_frame = -1;
        }

        let mut warnings = Vec::new();
        let start = (self.current_frame + 1) as usize;
        for index in start..=target as usize {
            self.execute_frame(index, &mut warnings);
            self.current_frame = index as i32;
        }
        warnings
    }

    /// Advances to the next frame, looping back to frame 0 (with a fresh
    /// display list) once the end of the movie is passed.
    pub fn advance(&mut self) -> Vec<DisplayListError> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        let next = self.current_frame + 1;
        if next as usize >= self.frames.len() {
            self.display_list.clear();
            self.current_frame = -1;
            self.seek(0)
        } else {
            self.seek(next)
        }
    }

    fn execute_frame(&mut self, index: usize, warnings: &mut Vec<DisplayListError>) {
        for action in &self.frames[index].actions {
            match action {
                // The library already owns this definition; nothing to do.
                FrameAction::DefineCharacter { .. } => {}
                FrameAction::PlaceObject(data) => {
                    if let Err(error) = self.display_list.place(data) {
                        log::warn!("frame {}: {}", index, error);
                        warnings.push(error);
                    }
                }
                FrameAction::RemoveObject { depth } => self.display_list.remove(*depth),
                FrameAction::SetBackgroundColor(color) => {
                    self.display_list.set_background_color(*color)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_list::PlaceObjectData;
    use pretty_assertions::assert_eq;
    use swf::PlaceObjectAction;

    fn place(depth: Depth, id: CharacterId, tx: i32) -> FrameAction {
        FrameAction::PlaceObject(PlaceObjectData {
            depth,
            action: PlaceObjectAction::Place(id),
            matrix: Some(swf::Matrix::translate(
                swf::Twips::new(tx),
                swf::Twips::new(0),
            )),
            color_transform: None,
            ratio: None,
            name: None,
            clip_depth: None,
            blend_mode: None,
            filters: None,
            is_visible: None,
        })
    }

    fn modify(depth: Depth, tx: i32) -> FrameAction {
        FrameAction::PlaceObject(PlaceObjectData {
            depth,
            action: PlaceObjectAction::Modify,
            matrix: Some(swf::Matrix::translate(
                swf::Twips::new(tx),
                swf::Twips::new(0),
            )),
            color_transform: None,
            ratio: None,
            name: None,
            clip_depth: None,
            blend_mode: None,
            filters: None,
            is_visible: None,
        })
    }

    fn remove(depth: Depth) -> FrameAction {
        FrameAction::RemoveObject { depth }
    }

    fn place_modify_remove_timeline() -> Timeline {
        let mut timeline = Timeline::new();
        timeline.add_frame(Frame {
            actions: vec![place(1, 1, 0)],
        });
        timeline.add_frame(Frame {
            actions: vec![modify(1, 100)],
        });
        timeline.add_frame(Frame {
            actions: vec![remove(1)],
        });
        timeline
    }

    #[test]
    fn place_modify_remove_sequence() {
        let mut timeline = place_modify_remove_timeline();

        timeline.seek(0);
        assert_eq!(timeline.display_list().len(), 1);
        assert_eq!(timeline.display_list().get(1).unwrap().matrix.tx.get(), 0);

        timeline.seek(1);
        assert_eq!(timeline.display_list().get(1).unwrap().matrix.tx.get(), 100);

        timeline.seek(2);
        assert!(timeline.display_list().is_empty());
    }

    #[test]
    fn seek_is_deterministic_regardless_of_path() {
        let mut via_path = place_modify_remove_timeline();
        via_path.seek(2);
        via_path.seek(0);

        let mut fresh = place_modify_remove_timeline();
        fresh.seek(0);

        assert_eq!(
            via_path.display_list().get(1).unwrap().matrix,
            fresh.display_list().get(1).unwrap().matrix
        );
    }

    #[test]
    fn advance_loops_back_to_frame_zero() {
        let mut timeline = place_modify_remove_timeline();
        timeline.seek(2);
        timeline.advance();
        assert_eq!(timeline.current_frame(), 0);
        assert_eq!(timeline.display_list().get(1).unwrap().matrix.tx.get(), 0);
    }

    #[test]
    fn seek_out_of_range_is_a_no_op() {
        let mut timeline = place_modify_remove_timeline();
        timeline.seek(0);
        timeline.seek(99);
        assert_eq!(timeline.current_frame(), 0);
        timeline.seek(-1);
        assert_eq!(timeline.current_frame(), 0);
    }
}
