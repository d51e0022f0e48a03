// #![warn(clippy::pedantic)]
// #![warn(clippy::nursery)]
// #![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::correctness)]
#![warn(clippy::perf)]
#![warn(clippy::style)]
#![warn(clippy::suspicious)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
// #![warn(clippy::unwrap_used)]
// #![warn(clippy::expect_used)]

//! Map cubes of solar imaging data that keep track of their exposure-time
//! normalization, and sequences of such cubes.

pub mod common;
pub mod coords;
pub mod cube;
pub mod error;
pub mod sequence;
pub mod wcs;

pub use common::{meta::Meta, meta::MetaValue, unit::DataUnit};
pub use coords::{CoordValues, ExtraCoord, ExtraCoords};
pub use cube::{
    correction::{Direction, ExposureCorrection, ScaleState, Transition},
    MapCube, MapCubeBuilder, Uncertainty,
};
pub use error::{Error, Result};
pub use sequence::MapCubeSequence;
pub use wcs::{Wcs, WcsAxis};
