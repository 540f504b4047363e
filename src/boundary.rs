use crate::heightmap::Coordinate;
use crate::heightmap::Heightmap;
use crate::path::GridPath;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

/// The boundary of the region of interest: a closed polygon made of four
/// paths. The source and sink paths mark where water enters and leaves; the
/// top and bottom paths connect them. Each path's last point coincides with
/// the next path's first point, in the order source, top, sink, bottom.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct Boundary {
    pub source: GridPath,
    pub top: GridPath,
    pub sink: GridPath,
    pub bottom: GridPath,
}

impl Boundary {
    // The default boundary spanning the full extent of a `width` x `height`
    // grid: source on the left edge, sink on the right.
    #[must_use]
    pub fn rectangle(width: usize, height: usize) -> Self {
        let (w, h) = (width as i32 - 1, height as i32 - 1);
        Self {
            source: GridPath::segment(Coordinate::new(0, h), Coordinate::new(0, 0)),
            top: GridPath::segment(Coordinate::new(0, 0), Coordinate::new(w, 0)),
            sink: GridPath::segment(Coordinate::new(w, 0), Coordinate::new(w, h)),
            bottom: GridPath::segment(Coordinate::new(w, h), Coordinate::new(0, h)),
        }
    }

    #[must_use]
    pub fn for_heightmap(map: &Heightmap) -> Self {
        Self::rectangle(map.width(), map.height())
    }

    #[must_use]
    pub const fn new(source: GridPath, top: GridPath, sink: GridPath, bottom: GridPath) -> Self {
        Self { source, top, sink, bottom }
    }

    /// Returns the rasterized version of this boundary. Besides rasterizing
    /// the four paths, this trims runs where the end of one path doubles back
    /// over the start of the next, which would otherwise make the boundary
    /// visit coordinates twice.
    #[must_use]
    pub fn rasterize(&self) -> Self {
        let mut source = self.source.rasterize();
        let mut top = self.top.rasterize();
        let mut sink = self.sink.rasterize();
        let mut bottom = self.bottom.rasterize();

        remove_common_parts(&mut source, &mut top);
        remove_common_parts(&mut top, &mut sink);
        remove_common_parts(&mut sink, &mut bottom);
        remove_common_parts(&mut bottom, &mut source);

        Self::new(source, top, sink, bottom)
    }

    /// Checks that no grid coordinate is visited twice along the boundary.
    /// Meant to be called on a rasterized boundary.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut visited = HashSet::new();
        for path in [&self.source, &self.top, &self.sink, &self.bottom] {
            // the last point of each path is the first point of the next
            for &c in &path.points[..path.points.len().saturating_sub(1)] {
                if !visited.insert(c) {
                    return false;
                }
            }
        }
        true
    }

    // Orientation via the signed area (y-axis pointing down, so a positive
    // area means clockwise in screen coordinates).
    #[must_use]
    pub fn is_clockwise(&self) -> bool {
        let mut area: i64 = 0;
        for path in [&self.source, &self.top, &self.sink, &self.bottom] {
            for w in path.points.windows(2) {
                area += i64::from(w[0].x) * i64::from(w[1].y) - i64::from(w[1].x) * i64::from(w[0].y);
            }
        }
        area > 0
    }
}

// Trims the overlap where the end of `p1` retraces the start of `p2`. The
// scan stops as soon as the two paths drift more than two cells apart.
fn remove_common_parts(p1: &mut GridPath, p2: &mut GridPath) {
    let mut to_remove = 0;
    for i in 1..p1.length().min(p2.length()) {
        let c1 = p1.points[p1.length() - i];
        let c2 = p2.points[i];
        if c1 == c2 {
            to_remove = i;
        }
        if (c1.x - c2.x).abs() > 2 || (c1.y - c2.y).abs() > 2 {
            break;
        }
    }
    p1.points.truncate(p1.points.len() - to_remove);
    p2.points.drain(..to_remove);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn rectangle_is_closed_and_valid() {
        let boundary = Boundary::rectangle(4, 3).rasterize();
        assert_eq!(boundary.source.end(), boundary.top.start());
        assert_eq!(boundary.top.end(), boundary.sink.start());
        assert_eq!(boundary.sink.end(), boundary.bottom.start());
        assert_eq!(boundary.bottom.end(), boundary.source.start());
        assert!(boundary.is_valid());
    }

    #[test]
    fn rectangle_orientation() {
        // y points down, so the default traversal (up the left edge, right
        // along the top, ...) has positive signed area
        assert!(Boundary::rectangle(4, 3).is_clockwise());

        // the mirrored polygon: source on the right, running bottom to top
        let flipped = Boundary::new(
            GridPath::segment(c(3, 2), c(3, 0)),
            GridPath::segment(c(3, 0), c(0, 0)),
            GridPath::segment(c(0, 0), c(0, 2)),
            GridPath::segment(c(0, 2), c(3, 2)),
        );
        assert!(!flipped.is_clockwise());
    }

    #[test]
    fn rasterize_is_idempotent() {
        let boundary = Boundary::rectangle(5, 4).rasterize();
        let again = boundary.rasterize();
        assert_eq!(boundary.source, again.source);
        assert_eq!(boundary.top, again.top);
        assert_eq!(boundary.sink, again.sink);
        assert_eq!(boundary.bottom, again.bottom);
    }

    #[test]
    fn duplicate_visit_is_invalid() {
        let mut boundary = Boundary::rectangle(3, 3).rasterize();
        let repeat = boundary.top.points[1];
        boundary.bottom.points.insert(1, repeat);
        assert!(!boundary.is_valid());
    }
}
