//! Cursor hit-testing over annotation points and boxes.

use super::geometry::{Bounds, POINT_HIT_RADIUS, Point, opposite_corners};

/// Which corner point the cursor is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointHover {
    /// A stored point, by index into the point list.
    Stored(usize),
    /// A virtual opposite corner of the pair `pair`; `second` picks `(q.x, p.y)`.
    Virtual { pair: usize, second: bool },
}

/// Nearest hoverable corner within [`POINT_HIT_RADIUS`] of the cursor.
///
/// Both the stored points and the virtual opposite corners of every completed
/// pair compete; a stored point wins only when strictly closer than the best
/// virtual corner.
pub fn nearest_point(points: &[Point], cursor: Point) -> Option<PointHover> {
    let mut best_stored: Option<(usize, f32)> = None;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance_to(cursor);
        if best_stored.is_none_or(|(_, bd)| d < bd) {
            best_stored = Some((i, d));
        }
    }

    let mut best_virtual: Option<(usize, f32)> = None;
    for pair in 0..points.len() / 2 {
        let corners = opposite_corners(points[2 * pair], points[2 * pair + 1]);
        for (j, c) in corners.iter().enumerate() {
            let d = c.distance_to(cursor);
            if best_virtual.is_none_or(|(_, bd)| d < bd) {
                best_virtual = Some((2 * pair + j, d));
            }
        }
    }

    let stored_d = best_stored.map_or(f32::INFINITY, |(_, d)| d);
    let virtual_d = best_virtual.map_or(f32::INFINITY, |(_, d)| d);
    if stored_d < virtual_d && stored_d < POINT_HIT_RADIUS {
        best_stored.map(|(i, _)| PointHover::Stored(i))
    } else if virtual_d < POINT_HIT_RADIUS {
        best_virtual.map(|(i, _)| PointHover::Virtual { pair: i / 2, second: i % 2 == 1 })
    } else {
        None
    }
}

/// Index of the smallest-area completed box containing the cursor.
///
/// Ties keep the earliest pair, matching the scan order boxes were drawn in.
pub fn smallest_box_under(points: &[Point], cursor: Point) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for pair in 0..points.len() / 2 {
        let b = Bounds::from_corners(points[2 * pair], points[2 * pair + 1]);
        if b.contains(cursor) && best.is_none_or(|(_, ba)| b.area() < ba) {
            best = Some((pair, b.area()));
        }
    }
    best.map(|(i, _)| i)
}
