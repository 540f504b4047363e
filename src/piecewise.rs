use crate::point::Point;
use serde::Deserialize;
use serde::Serialize;

// A univariate polynomial piece of a piecewise function. The container below
// only needs evaluation and the two linear-space operations.
pub trait Piece: Copy + Default {
    fn eval(&self, h: f64) -> f64;
    #[must_use]
    fn add(&self, other: &Self) -> Self;
    #[must_use]
    fn scale(&self, factor: f64) -> Self;
}

/// A cubic function `c0 + c1 h + c2 h^2 + c3 h^3`.
#[derive(Default, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicFunction {
    coefficients: [f64; 4],
}

impl CubicFunction {
    #[must_use]
    pub const fn new(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self { coefficients: [c0, c1, c2, c3] }
    }
}

impl Piece for CubicFunction {
    fn eval(&self, h: f64) -> f64 {
        let [c0, c1, c2, c3] = self.coefficients;
        c0 + c1 * h + c2 * h * h + c3 * h * h * h
    }

    fn add(&self, other: &Self) -> Self {
        let a = self.coefficients;
        let b = other.coefficients;
        Self::new(a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3])
    }

    fn scale(&self, factor: f64) -> Self {
        let [c0, c1, c2, c3] = self.coefficients;
        Self::new(c0 * factor, c1 * factor, c2 * factor, c3 * factor)
    }
}

/// A linear function `c0 + c1 h`.
#[derive(Default, Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearFunction {
    coefficients: [f64; 2],
}

impl LinearFunction {
    #[must_use]
    pub const fn new(c0: f64, c1: f64) -> Self {
        Self { coefficients: [c0, c1] }
    }

    /// The height at which this function evaluates to `volume`, or NaN for a
    /// constant function.
    #[must_use]
    pub fn height_for_volume(&self, volume: f64) -> f64 {
        if self.coefficients[1] == 0. {
            return f64::NAN;
        }
        (volume - self.coefficients[0]) / self.coefficients[1]
    }
}

impl Piece for LinearFunction {
    fn eval(&self, h: f64) -> f64 {
        self.coefficients[0] + self.coefficients[1] * h
    }

    fn add(&self, other: &Self) -> Self {
        Self::new(
            self.coefficients[0] + other.coefficients[0],
            self.coefficients[1] + other.coefficients[1],
        )
    }

    fn scale(&self, factor: f64) -> Self {
        Self::new(self.coefficients[0] * factor, self.coefficients[1] * factor)
    }
}

/// A piecewise function: a sequence of pieces separated by ascending
/// breakpoints. `pieces[0]` applies below `breakpoints[0]`, `pieces[i]`
/// between `breakpoints[i - 1]` and `breakpoints[i]`, and the last piece from
/// the last breakpoint on, so there is always one piece more than there are
/// breakpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piecewise<F> {
    breakpoints: Vec<f64>,
    pieces: Vec<F>,
}

pub type PiecewiseCubic = Piecewise<CubicFunction>;
pub type PiecewiseLinear = Piecewise<LinearFunction>;

impl<F: Piece> Default for Piecewise<F> {
    // The zero function.
    fn default() -> Self {
        Self { breakpoints: vec![], pieces: vec![F::default()] }
    }
}

impl<F: Piece> Piecewise<F> {
    #[must_use]
    pub fn from_piece(piece: F) -> Self {
        Self { breakpoints: vec![], pieces: vec![piece] }
    }

    #[must_use]
    pub fn from_parts(breakpoints: Vec<f64>, pieces: Vec<F>) -> Self {
        debug_assert_eq!(pieces.len(), breakpoints.len() + 1);
        debug_assert!(breakpoints.windows(2).all(|w| w[0] <= w[1]));
        Self { breakpoints, pieces }
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    // The piece that applies at the given height.
    #[must_use]
    pub fn piece_at(&self, h: f64) -> &F {
        let i = self.breakpoints.partition_point(|&b| b < h);
        &self.pieces[i]
    }

    #[must_use]
    pub fn eval(&self, h: f64) -> f64 {
        self.piece_at(h).eval(h)
    }

    // Sum of two piecewise functions; the breakpoint sequences are merged.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut breakpoints = Vec::new();
        let mut pieces = Vec::new();
        let mut i = 0;
        let mut j = 0;

        while i < self.breakpoints.len() || j < other.breakpoints.len() {
            pieces.push(self.pieces[i].add(&other.pieces[j]));
            if j == other.breakpoints.len()
                || (i < self.breakpoints.len() && self.breakpoints[i] < other.breakpoints[j])
            {
                breakpoints.push(self.breakpoints[i]);
                i += 1;
            } else {
                breakpoints.push(other.breakpoints[j]);
                j += 1;
            }
        }
        pieces.push(self.pieces[i].add(&other.pieces[j]));

        Self { breakpoints, pieces }
    }

    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.scale(-1.))
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            breakpoints: self.breakpoints.clone(),
            pieces: self.pieces.iter().map(|f| f.scale(factor)).collect(),
        }
    }

    /// Drops all pieces strictly above `h`. Function values at or below `h`
    /// are unchanged; above `h` the last remaining piece extrapolates.
    pub fn prune(&mut self, h: f64) {
        let i = self.breakpoints.partition_point(|&b| b < h);
        if i == self.pieces.len() - 1 {
            return;
        }
        self.pieces.truncate(i + 1);
        self.breakpoints.truncate(i);
    }

    /// Overwrites the function to be zero for all heights above `h`.
    pub fn set_to_zero_above(&mut self, h: f64) {
        self.prune(h);
        self.pieces.push(F::default());
        self.breakpoints.push(h);
    }
}

impl PiecewiseCubic {
    /// The volume of sediment above height `h` within the triangle spanned by
    /// the three corners, as a piecewise cubic in `h`. The corners must be
    /// sorted ascending by elevation (simulation-of-simplicity order).
    ///
    /// Below the lowest corner the volume shrinks linearly; between the
    /// lowest and middle corner quadratically; between the middle and highest
    /// corner the remainder is a single cubic spike; above the highest corner
    /// it is zero. The coefficients follow from the triangle's area and the
    /// two sub-triangle areas obtained by slicing at the middle height, which
    /// also makes the function C^1 at the breakpoints.
    #[must_use]
    pub fn for_triangle(p1: Point, p2: Point, p3: Point) -> Self {
        let (h1, h2, h3) = (p1.h, p2.h, p3.h);
        debug_assert!(h1 <= h2 && h2 <= h3);

        let t = area(p1, p2, p3).abs();

        let mut c = 0.;
        let mut d = 0.;
        if h1 != h3 {
            let p = p1 + (p3 - p1) * ((h2 - h1) / (h3 - h1));
            if h2 != h3 {
                let t_p = area(p, p2, p3).abs();
                c = t_p / (3. * (h3 - h2) * (h3 - h2));
            }
            if h1 != h2 {
                let t_n = area(p, p2, p1).abs();
                d = t_n / (3. * (h2 - h1) * (h2 - h1));
            }
        }

        let tet_n = CubicFunction::new(-d * h1 * h1 * h1, 3. * d * h1 * h1, -3. * d * h1, d);
        let cub3 = CubicFunction::new(c * h3 * h3 * h3, -3. * c * h3 * h3, 3. * c * h3, -c);
        let cub2 =
            CubicFunction::new(cub3.eval(h2) + h2 * t - tet_n.eval(h2), -t, 0., 0.).add(&tet_n);
        let cub1 = CubicFunction::new(cub2.eval(h1) + h1 * t, -t, 0., 0.);

        Self {
            breakpoints: vec![h1, h2, h3],
            pieces: vec![cub1, cub2, cub3, CubicFunction::default()],
        }
    }
}

impl PiecewiseLinear {
    /// The volume above height `h` of a quarter grid-cell pillar topped at
    /// the elevation of `p`. The zero function if `p` is nodata.
    #[must_use]
    pub fn quarter_pillar(p: Point) -> Self {
        if p.h.is_nan() {
            return Self::default();
        }
        Self {
            breakpoints: vec![p.h],
            pieces: vec![LinearFunction::new(0.25 * p.h, -0.25), LinearFunction::default()],
        }
    }

    /// The height at which this (assumed decreasing) function reaches the
    /// given volume, clamped to the interval of the piece that attains it.
    #[must_use]
    pub fn height_for_volume(&self, volume: f64) -> f64 {
        for i in 0..self.breakpoints.len() {
            let breakpoint = self.breakpoints[i];
            if self.pieces[i + 1].eval(breakpoint) < volume {
                let mut height = self.pieces[i].height_for_volume(volume);
                height = height.min(breakpoint);
                if i > 0 {
                    height = height.max(self.breakpoints[i - 1]);
                }
                return height;
            }
        }

        let height = self.pieces.last().unwrap().height_for_volume(volume);
        match self.breakpoints.last() {
            Some(&last) => height.max(last),
            None => height,
        }
    }
}

/// Signed area of the triangle spanned by the given points (xy only).
#[must_use]
pub fn area(p1: Point, p2: Point, p3: Point) -> f64 {
    let mut sum = 0.;
    sum += (p2.x - p1.x) * (p1.y + p2.y);
    sum += (p3.x - p2.x) * (p2.y + p3.y);
    sum += (p1.x - p3.x) * (p3.y + p1.y);
    sum / 2.
}
