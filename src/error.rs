use thiserror::Error;

/// Errors surfaced by the extraction pipeline and the file readers and
/// writers. Internal structure violations (such as an inconsistent half-edge
/// mesh) are bugs and are handled with debug assertions instead.
#[derive(Error, Debug)]
pub enum Error {
    // Malformed input file: wrong header, non-numeric tokens, inconsistent
    // counts, out-of-range coordinates.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // The boundary self-intersects or its paths fail to join.
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    // The boundary interior contains nodata values, on which the Morse
    // analysis is undefined.
    #[error("the area inside the boundary contains nodata values")]
    NodataInInterior,

    // The gradient field produced a saddle of the wrong degree (a
    // monkey-saddle-like configuration that the secondary pairing could not
    // resolve).
    #[error("degenerate saddle at ({x}, {y})")]
    DegenerateSaddle { x: f64, y: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
