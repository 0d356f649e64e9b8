//! Image-space geometry for annotation points and corner-pair boxes.

/// Hover radius around a corner point, in image pixels.
pub const POINT_HIT_RADIUS: f32 = 6.0;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Clamp into `[0, width] x [0, height]`.
    pub fn clamped(self, width: f32, height: f32) -> Point {
        Point::new(self.x.clamp(0.0, width), self.y.clamp(0.0, height))
    }

    /// Round both coordinates to whole pixels.
    pub fn rounded(self) -> Point {
        Point::new(self.x.round(), self.y.round())
    }
}

/// Normalized bounds of a corner pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Bounds {
    /// Bounds of the rectangle spanned by two corners, in any order.
    pub fn from_corners(p: Point, q: Point) -> Self {
        Self {
            xmin: p.x.min(q.x),
            ymin: p.y.min(q.y),
            xmax: p.x.max(q.x),
            ymax: p.y.max(q.y),
        }
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Whether a point lies inside the bounds, edges included.
    pub fn contains(&self, point: Point) -> bool {
        self.xmin <= point.x && point.x <= self.xmax && self.ymin <= point.y && point.y <= self.ymax
    }

    pub fn min_corner(&self) -> Point {
        Point::new(self.xmin, self.ymin)
    }

    pub fn max_corner(&self) -> Point {
        Point::new(self.xmax, self.ymax)
    }
}

/// The two corners of a stored pair that are not stored: `(p.x, q.y)` and `(q.x, p.y)`.
pub fn opposite_corners(p: Point, q: Point) -> [Point; 2] {
    [Point::new(p.x, q.y), Point::new(q.x, p.y)]
}

/// Rewrite every completed pair as `((xmin, ymin), (xmax, ymax))` with whole-pixel
/// coordinates. A trailing unpaired point is rounded but otherwise left alone.
pub fn normalize_pairs(points: &mut [Point]) {
    let pairs = points.len() / 2;
    for i in 0..pairs {
        let b = Bounds::from_corners(points[2 * i], points[2 * i + 1]);
        points[2 * i] = b.min_corner().rounded();
        points[2 * i + 1] = b.max_corner().rounded();
    }
    if points.len() % 2 == 1 {
        let last = points.len() - 1;
        points[last] = points[last].rounded();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance() {
        let p = Point::new(0.0, 0.0);
        assert!((p.distance_to(Point::new(3.0, 4.0)) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_to_image() {
        let p = Point::new(-5.0, 700.0).clamped(640.0, 480.0);
        assert_eq!(p, Point::new(0.0, 480.0));
        // In-range points are untouched, edges included
        assert_eq!(Point::new(640.0, 0.0).clamped(640.0, 480.0), Point::new(640.0, 0.0));
    }

    #[test]
    fn bounds_from_reversed_corners() {
        let b = Bounds::from_corners(Point::new(50.0, 80.0), Point::new(10.0, 20.0));
        assert_eq!(b, Bounds { xmin: 10.0, ymin: 20.0, xmax: 50.0, ymax: 80.0 });
        assert_eq!(b.area(), 40.0 * 60.0);
    }

    #[test]
    fn bounds_contains_edges() {
        let b = Bounds::from_corners(Point::new(10.0, 10.0), Point::new(20.0, 30.0));
        assert!(b.contains(Point::new(10.0, 10.0)));
        assert!(b.contains(Point::new(20.0, 30.0)));
        assert!(!b.contains(Point::new(20.1, 15.0)));
    }

    #[test]
    fn opposite_corners_of_pair() {
        let [a, b] = opposite_corners(Point::new(1.0, 2.0), Point::new(5.0, 9.0));
        assert_eq!(a, Point::new(1.0, 9.0));
        assert_eq!(b, Point::new(5.0, 2.0));
    }

    #[test]
    fn normalize_orders_each_pair() {
        let mut points = vec![
            Point::new(30.4, 5.6),
            Point::new(10.2, 40.1),
            Point::new(8.0, 8.0),
            Point::new(2.0, 2.0),
        ];
        normalize_pairs(&mut points);
        assert_eq!(points[0], Point::new(10.0, 6.0));
        assert_eq!(points[1], Point::new(30.0, 40.0));
        assert_eq!(points[2], Point::new(2.0, 2.0));
        assert_eq!(points[3], Point::new(8.0, 8.0));
        // xmin <= xmax and ymin <= ymax for every stored pair
        for pair in points.chunks(2) {
            assert!(pair[0].x <= pair[1].x);
            assert!(pair[0].y <= pair[1].y);
        }
    }

    #[test]
    fn normalize_keeps_pending_point() {
        let mut points = vec![
            Point::new(9.0, 9.0),
            Point::new(1.0, 1.0),
            Point::new(3.7, 4.2),
        ];
        normalize_pairs(&mut points);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point::new(4.0, 4.0));
    }
}
