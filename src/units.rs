use crate::point::Point;
use serde::Deserialize;
use serde::Serialize;

// Converter between grid units (x- and y-values in cell counts) and
// real-world units.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Units {
    // The horizontal resolution in the x-direction, in meters per cell.
    pub x_resolution: f64,
    // The horizontal resolution in the y-direction, in meters per cell.
    pub y_resolution: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self { x_resolution: 1., y_resolution: 1. }
    }
}

impl Units {
    // Both resolutions must be positive.
    #[must_use]
    pub fn new(x_resolution: f64, y_resolution: f64) -> Self {
        debug_assert!(x_resolution > 0.);
        debug_assert!(y_resolution > 0.);
        Self { x_resolution, y_resolution }
    }

    // Two-dimensional length in meters of the segment between two points
    // given in grid coordinates.
    #[must_use]
    pub fn length(&self, p1: Point, p2: Point) -> f64 {
        let dx = self.x_resolution * (p1.x - p2.x);
        let dy = self.y_resolution * (p1.y - p2.y);
        dx.hypot(dy)
    }

    // Volume in cubic meters, given a volume in grid units.
    #[must_use]
    pub fn to_real_volume(&self, volume: f64) -> f64 {
        volume * self.x_resolution * self.y_resolution
    }

    // Inverse of `to_real_volume`.
    #[must_use]
    pub fn from_real_volume(&self, volume: f64) -> f64 {
        volume / self.x_resolution / self.y_resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_respects_anisotropic_resolution() {
        let units = Units::new(2., 3.);
        let len = units.length(Point::new(0., 0., 0.), Point::new(1., 1., 5.));
        assert!((len - (4.0f64 + 9.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn volume_conversion_round_trips() {
        let units = Units::new(2.5, 4.);
        let v = 12.3;
        assert!((units.from_real_volume(units.to_real_volume(v)) - v).abs() < 1e-12);
        assert!((units.to_real_volume(1.) - 10.).abs() < 1e-12);
    }
}
