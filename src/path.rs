use crate::heightmap::Coordinate;
use serde::Deserialize;
use serde::Serialize;

/// An ordered sequence of grid coordinates, used to delimit the region of
/// interest. Consecutive points may be any distance apart until the path is
/// rasterized; afterwards they differ by at most one grid step.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPath {
    pub points: Vec<Coordinate>,
}

impl GridPath {
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    #[must_use]
    pub fn segment(start: Coordinate, end: Coordinate) -> Self {
        Self { points: vec![start, end] }
    }

    #[must_use]
    pub fn start(&self) -> Coordinate {
        self.points[0]
    }

    #[must_use]
    pub fn end(&self) -> Coordinate {
        *self.points.last().unwrap()
    }

    // The number of edges (one less than the number of points).
    #[must_use]
    pub fn length(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn add_point(&mut self, point: Coordinate) {
        self.points.push(point);
    }

    // Appends another path; its first point must coincide with our last.
    pub fn append(&mut self, other: &Self) {
        debug_assert_eq!(self.end(), other.start());
        self.points.extend_from_slice(&other.points[1..]);
    }

    /// Returns the rasterized version of this path: every edge longer than
    /// one grid step is subdivided at its midpoint until all steps are unit
    /// steps, diagonal steps are bent through an intermediate corner, and
    /// spikes are removed afterwards.
    #[must_use]
    pub fn rasterize(&self) -> Self {
        let mut result = Self::new();
        result.add_point(self.start());
        for &p in &self.points[1..] {
            result.append_rasterized_edge_to(p);
        }
        result.remove_spikes();
        result
    }

    fn append_rasterized_edge_to(&mut self, point: Coordinate) {
        let p1 = self.end();
        let p2 = point;

        let distance = (p1.x - p2.x).abs() + (p1.y - p2.y).abs();
        match distance {
            0 => {}
            1 => self.add_point(p2),
            2 if (p1.x - p2.x).abs() == 1 => {
                // diagonal edge: bend through the shared corner
                self.add_point(Coordinate::new(p1.x, p2.y));
                self.add_point(p2);
            }
            _ => {
                // subdivide the edge in two parts and recurse on those
                let mid = Coordinate::midpoint_between(p1, p2);
                self.append_rasterized_edge_to(mid);
                self.append_rasterized_edge_to(p2);
            }
        }
    }

    /// Removes duplicates (A-A) and spikes (A-B-A) until none remain.
    pub fn remove_spikes(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            let mut i = 1;
            while i + 1 <= self.points.len().saturating_sub(1) {
                if self.points[i - 1] == self.points[i] {
                    self.points.remove(i);
                    changed = true;
                    continue;
                }
                if self.points[i - 1] == self.points[i + 1] {
                    // points[i] is the tip of a spike
                    self.points.drain(i..=i + 1);
                    changed = true;
                    i = i.saturating_sub(1).max(1);
                    continue;
                }
                i += 1;
            }
            // a trailing duplicate is not covered by the window above
            if self.points.len() >= 2
                && self.points[self.points.len() - 1] == self.points[self.points.len() - 2]
            {
                self.points.pop();
                changed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coordinate {
        Coordinate::new(x, y)
    }

    #[test]
    fn rasterize_interpolates_long_edges() {
        let path = GridPath::segment(c(0, 0), c(4, 0));
        let rasterized = path.rasterize();
        assert_eq!(rasterized.points, vec![c(0, 0), c(1, 0), c(2, 0), c(3, 0), c(4, 0)]);
    }

    #[test]
    fn rasterize_bends_diagonals() {
        let path = GridPath::segment(c(0, 0), c(1, 1));
        let rasterized = path.rasterize();
        assert_eq!(rasterized.points, vec![c(0, 0), c(0, 1), c(1, 1)]);
    }

    #[test]
    fn rasterize_is_idempotent() {
        let mut path = GridPath::new();
        for p in [c(0, 0), c(3, 2), c(5, 5), c(2, 5)] {
            path.add_point(p);
        }
        let once = path.rasterize();
        let twice = once.rasterize();
        assert_eq!(once, twice);
        for w in once.points.windows(2) {
            let step = (w[0].x - w[1].x).abs() + (w[0].y - w[1].y).abs();
            assert_eq!(step, 1);
        }
    }

    #[test]
    fn remove_spikes_removes_doubles_and_spikes() {
        let mut path = GridPath {
            points: vec![c(0, 0), c(1, 0), c(1, 0), c(2, 0), c(1, 0), c(2, 0), c(3, 0)],
        };
        path.remove_spikes();
        assert_eq!(path.points, vec![c(0, 0), c(1, 0), c(2, 0), c(3, 0)]);
    }

    #[test]
    fn remove_spikes_cascades() {
        // collapsing the inner spike exposes an outer one
        let mut path = GridPath {
            points: vec![c(0, 0), c(1, 0), c(2, 0), c(3, 0), c(2, 0), c(1, 0), c(0, 0)],
        };
        path.remove_spikes();
        assert_eq!(path.points, vec![c(0, 0)]);
    }

    #[test]
    fn append_joins_at_shared_point() {
        let mut path = GridPath::segment(c(0, 0), c(1, 0));
        path.append(&GridPath::segment(c(1, 0), c(1, 1)));
        assert_eq!(path.points, vec![c(0, 0), c(1, 0), c(1, 1)]);
    }
}
