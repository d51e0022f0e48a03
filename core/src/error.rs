use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Precondition violations raised by cubes and sequences.
///
/// Every operation checks its preconditions before touching any data, so an
/// error always leaves the receiver as it was before the call.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Exposure time correction needs a 2D or 3D cube, got {ndim}D")]
    #[diagnostic(
        code(solar_cube::dimension),
        help("Index the cube down to a single raster step or slice stack first")
    )]
    UnsupportedDimensionality { ndim: usize },

    #[error("Missing extra coordinate {name}")]
    #[diagnostic(code(solar_cube::missing_extra_coord))]
    MissingExtraCoord { name: String },

    #[error("Extra coordinate {name} has {len} values, expected 1 or {expected} (axis {axis:?})")]
    #[diagnostic(code(solar_cube::exposure_length))]
    ExposureLength {
        name: String,
        axis: Option<usize>,
        len: usize,
        expected: usize,
    },

    #[error("Extra coordinate {name} is on axis {axis}, but the cube only has {ndim} axes")]
    #[diagnostic(code(solar_cube::extra_coord_axis))]
    ExtraCoordAxis {
        name: String,
        axis: usize,
        ndim: usize,
    },

    #[error("Invalid exposure time {value} s")]
    #[diagnostic(
        code(solar_cube::invalid_exposure),
        help("Exposure times must be finite and greater than zero")
    )]
    InvalidExposure { value: f64 },

    #[error("Extra coordinate {name} does not hold exposure durations")]
    #[diagnostic(code(solar_cube::exposure_kind))]
    ExposureKind { name: String },

    #[error("Shape of {what} ({found:?}) doesn't match the data ({expected:?})")]
    #[diagnostic(code(solar_cube::shape))]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Coordinate transform has {naxis} axes but {missing} missing-axis flags")]
    #[diagnostic(code(solar_cube::missing_axes))]
    MissingAxesLength { naxis: usize, missing: usize },

    #[error("Coordinate transform describes {present} present axes, data has {ndim}")]
    #[diagnostic(code(solar_cube::axis_count))]
    AxisCountMismatch { present: usize, ndim: usize },

    #[error("Axis {axis} out of range for a {ndim}D cube")]
    #[diagnostic(code(solar_cube::axis_out_of_range))]
    AxisOutOfRange { axis: usize, ndim: usize },

    #[error("Index {index} out of bounds for length {len}")]
    #[diagnostic(code(solar_cube::index_out_of_bounds))]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("A cube sequence needs at least one cube")]
    #[diagnostic(code(solar_cube::empty_sequence))]
    EmptySequence,

    #[error("Common axis {axis} out of range for {ndim}D cubes")]
    #[diagnostic(code(solar_cube::common_axis))]
    CommonAxisOutOfRange { axis: usize, ndim: usize },

    #[error("Cube {index} is {found}D, expected {expected}D")]
    #[diagnostic(code(solar_cube::member_dimensionality))]
    MemberDimensionality {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cube {index} has shape {found:?}, expected {expected:?} outside the common axis")]
    #[diagnostic(code(solar_cube::member_shape))]
    MemberShape {
        index: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Cube {index} disagrees on {key} with the first cube of the sequence")]
    #[diagnostic(
        code(solar_cube::inconsistent_meta),
        help("Only cubes of the same observation can form one sequence")
    )]
    InconsistentMeta { index: usize, key: &'static str },

    #[error("Extra coordinate {name} holds different kinds of values across the sequence")]
    #[diagnostic(code(solar_cube::mixed_coord_values))]
    MixedCoordValues { name: String },
}
