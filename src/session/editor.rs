//! Per-image editing state: the point/label lists plus cursor, hover, drag,
//! and selection bookkeeping, mutated by pointer and keyboard events.
//!
//! Points are a flat list consumed two-at-a-time as opposing box corners; an
//! odd length means one corner is placed and the second is pending. Operations
//! return `true` when the edit has to reach the sidecar file; the caller holds
//! the flush back while a corner is pending and releases it once the list is
//! even again.

use super::geometry::{Bounds, Point, normalize_pairs, opposite_corners};
use super::hittest::{PointHover, nearest_point, smallest_box_under};

/// An in-flight whole-box drag. The grab offsets keep the cursor anchored to
/// the spot that was clicked; the frozen size keeps the box rigid while the
/// clamping pins it inside the image.
#[derive(Debug, Clone, Copy)]
struct BoxDrag {
    pair: usize,
    grab_min: (f32, f32),
    grab_max: (f32, f32),
    width: f32,
    height: f32,
}

/// Editing state for the image currently on screen.
#[derive(Debug, Default)]
pub struct ImageSession {
    pub points: Vec<Point>,
    pub labels: Vec<String>,
    pub image_width: f32,
    pub image_height: f32,
    /// Index of the selected box; meaningful while any box exists.
    pub selected: usize,
    /// Whether the selection is shown highlighted (toggled by cycling).
    pub highlighted: bool,
    pub hovered_point: Option<usize>,
    pub hovered_box: Option<usize>,
    /// Last cursor position in image space, unclamped.
    pub cursor: Point,
    moving_point: Option<usize>,
    moving_box: Option<BoxDrag>,
    loaded_points: Vec<Point>,
    loaded_labels: Vec<String>,
}

impl ImageSession {
    /// Replace the session contents with a freshly loaded image.
    pub fn load(
        &mut self,
        points: Vec<Point>,
        labels: Vec<String>,
        image_width: f32,
        image_height: f32,
    ) {
        self.loaded_points = points.clone();
        self.loaded_labels = labels.clone();
        self.points = points;
        self.labels = labels;
        self.image_width = image_width;
        self.image_height = image_height;
        self.reset_interaction();
        self.reset_highlight();
    }

    /// One corner placed, second pending.
    pub fn pending_corner(&self) -> bool {
        self.points.len() % 2 == 1
    }

    pub fn box_count(&self) -> usize {
        self.points.len() / 2
    }

    /// Rewrite every stored pair in `(min, max)` order with whole-pixel
    /// coordinates. Runs before every save.
    pub fn normalize(&mut self) {
        normalize_pairs(&mut self.points);
    }

    /// The in-progress box: the pending corner plus the clamped cursor.
    pub fn preview_box(&self) -> Option<(Point, Point)> {
        if !self.pending_corner() {
            return None;
        }
        let pending = *self.points.last()?;
        Some((pending, self.cursor.clamped(self.image_width, self.image_height)))
    }

    /// Drop selection back onto the last box and hide the highlight.
    fn reset_highlight(&mut self) {
        self.highlighted = false;
        self.selected = self.box_count().saturating_sub(1);
    }

    /// Forget hover and drag state. The indices are only valid until the
    /// point list shrinks, so every removal goes through here.
    fn reset_interaction(&mut self) {
        self.hovered_point = None;
        self.hovered_box = None;
        self.moving_point = None;
        self.moving_box = None;
    }

    /// Pointer button pressed. Grabs the hovered point or box; ignored while a
    /// second corner is pending.
    pub fn press(&mut self, cursor: Point) {
        if self.pending_corner() {
            return;
        }
        if let Some(i) = self.hovered_point {
            self.moving_point = Some(i);
        } else if let Some(pair) = self.hovered_box {
            // Order the pair first so the frozen size is non-negative even
            // when a virtual-corner promotion left it in mixed order. The
            // size is capped at the image dims; a hand-edited sidecar can
            // hold a larger box, and the move clamping needs size <= image.
            let b = Bounds::from_corners(self.points[2 * pair], self.points[2 * pair + 1]);
            self.points[2 * pair] = b.min_corner();
            self.points[2 * pair + 1] = b.max_corner();
            self.moving_box = Some(BoxDrag {
                pair,
                grab_min: (cursor.x - b.xmin, cursor.y - b.ymin),
                grab_max: (cursor.x - b.xmax, cursor.y - b.ymax),
                width: b.width().min(self.image_width),
                height: b.height().min(self.image_height),
            });
            self.selected = pair;
        }
    }

    /// Pointer moved. Advances whichever drag is active, otherwise recomputes
    /// the hover state; a pending second corner freezes the hover so the
    /// preview cannot grab things underneath it.
    pub fn motion(&mut self, cursor: Point) {
        self.cursor = cursor;
        if let Some(i) = self.moving_point {
            self.points[i] = cursor.clamped(self.image_width, self.image_height);
        } else if let Some(drag) = self.moving_box {
            let min = Point::new(
                (cursor.x - drag.grab_min.0).clamp(0.0, self.image_width - drag.width),
                (cursor.y - drag.grab_min.1).clamp(0.0, self.image_height - drag.height),
            );
            let max = Point::new(
                (cursor.x - drag.grab_max.0).clamp(drag.width, self.image_width),
                (cursor.y - drag.grab_max.1).clamp(drag.height, self.image_height),
            );
            self.points[2 * drag.pair] = min;
            self.points[2 * drag.pair + 1] = max;
        } else if !self.pending_corner() {
            self.hovered_box = smallest_box_under(&self.points, cursor);
            self.hovered_point = match nearest_point(&self.points, cursor) {
                Some(PointHover::Stored(i)) => Some(i),
                Some(PointHover::Virtual { pair, second }) => {
                    Some(self.promote_virtual(pair, second))
                }
                None => None,
            };
        }
    }

    /// Pointer button released. Ends a drag or places a corner point; returns
    /// whether the edit is worth saving. `default_label` is assigned to a box
    /// the moment its second corner lands.
    pub fn release(&mut self, cursor: Point, default_label: &str) -> bool {
        let clamped = cursor.clamped(self.image_width, self.image_height);
        if self.moving_box.is_some() {
            self.moving_box = None;
            self.hovered_box = None;
            true
        } else if let Some(i) = self.moving_point {
            self.points[i] = clamped;
            self.moving_point = None;
            self.hovered_point = None;
            true
        } else {
            self.points.push(clamped);
            if self.pending_corner() {
                false
            } else {
                self.labels.push(default_label.to_string());
                self.reset_highlight();
                true
            }
        }
    }

    /// Rewrite a pair to its opposite-corner representation so the hovered
    /// virtual corner becomes a stored, draggable point. Returns its index.
    fn promote_virtual(&mut self, pair: usize, second: bool) -> usize {
        let [a, b] = opposite_corners(self.points[2 * pair], self.points[2 * pair + 1]);
        self.points[2 * pair] = a;
        self.points[2 * pair + 1] = b;
        2 * pair + second as usize
    }

    /// Remove everything on the image. The caller deletes the sidecar.
    pub fn clear(&mut self) {
        self.points.clear();
        self.labels.clear();
        self.reset_interaction();
        self.reset_highlight();
    }

    /// Backspace: remove the highlighted box, or the pending corner, or the
    /// last completed box. Returns whether a save is due; discarding a pending
    /// corner reports one, so edits made while the corner was pending still
    /// reach disk.
    pub fn backspace(&mut self) -> bool {
        if self.highlighted && self.box_count() > 0 {
            self.remove_box(self.selected);
            true
        } else if self.pending_corner() {
            self.points.pop();
            true
        } else if !self.points.is_empty() {
            self.points.truncate(self.points.len() - 2);
            self.labels.pop();
            self.reset_interaction();
            self.reset_highlight();
            true
        } else {
            false
        }
    }

    fn remove_box(&mut self, pair: usize) {
        self.points.drain(2 * pair..2 * pair + 2);
        self.labels.remove(pair);
        self.reset_interaction();
        if self.box_count() == 0 {
            self.reset_highlight();
        } else if self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Relabel the selected box. The highlight drops so the class color shows
    /// through. Returns whether a save is due.
    pub fn relabel(&mut self, class_name: &str) -> bool {
        self.highlighted = false;
        if self.labels.is_empty() {
            return false;
        }
        self.labels[self.selected] = class_name.to_string();
        true
    }

    /// Step the selection over the completed boxes, wrapping at both ends.
    pub fn cycle_selection(&mut self, forward: bool) {
        let count = self.box_count();
        if count == 0 {
            return;
        }
        self.highlighted = true;
        self.selected = if forward {
            (self.selected + 1) % count
        } else {
            (self.selected + count - 1) % count
        };
    }

    /// Throw away every edit since the image was loaded. Returns whether a
    /// save is due, which it is whenever anything changed.
    pub fn revert(&mut self) -> bool {
        let changed = self.points != self.loaded_points || self.labels != self.loaded_labels;
        self.points = self.loaded_points.clone();
        self.labels = self.loaded_labels.clone();
        self.reset_interaction();
        self.reset_highlight();
        changed
    }
}
