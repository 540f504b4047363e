//! Readers and writers for the text formats the tool exchanges: the bespoke
//! heightmap text format, ESRI/ASCII grids, boundary descriptions, and the
//! network graph and link sequence outputs.

pub mod boundary_file;
pub mod esri_grid;
pub mod network_file;
pub mod text_grid;
