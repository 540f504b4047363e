#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

//! Extraction of channel networks from digital elevation models of braided
//! rivers and tidal estuaries.
//!
//! The pipeline triangulates the grid inside a polygonal boundary, computes
//! a discrete gradient field and its Morse-Smale complex, simplifies the
//! complex by topological persistence, and emits a network graph whose
//! edges carry a significance value: the volume of sediment that has to be
//! excavated before the channel disappears.

pub mod boundary;
pub mod dcel;
pub mod error;
pub mod heightmap;
pub mod inputdcel;
pub mod inputgraph;
pub mod io;
pub mod mergetree;
pub mod mscomplex;
pub mod network;
pub mod path;
pub mod piecewise;
pub mod pipeline;
pub mod point;
pub mod simplify;
pub mod units;
