//! Exposure-time correction state of a cube.
//!
//! A cube is either [`Raw`](ScaleState::Raw) (detector counts per exposure)
//! or [`Scaled`](ScaleState::Scaled) (already divided by the exposure time).
//! [`ScaleState::transition`] decides whether a requested correction is
//! carried out; the cube then does the arithmetic.

use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use crate::{
    common::unit::DataUnit,
    coords::{ExtraCoords, EXPOSURE_TIME},
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScaleState {
    #[default]
    Raw,
    Scaled,
}

impl ScaleState {
    pub fn is_scaled(self) -> bool {
        self == ScaleState::Scaled
    }

    /// Whether a correction in `direction` should be carried out.
    ///
    /// A correction that would not change the state is skipped unless
    /// `force` is set.
    pub fn transition(self, direction: Direction, force: bool) -> Transition {
        let target = direction.target();
        if self == target && !force {
            Transition::Skip
        } else {
            Transition::Apply(target)
        }
    }
}

impl From<bool> for ScaleState {
    fn from(scaled: bool) -> Self {
        if scaled {
            ScaleState::Scaled
        } else {
            ScaleState::Raw
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Divide by the exposure time.
    Apply,
    /// Multiply by the exposure time.
    Undo,
}

impl Direction {
    pub fn target(self) -> ScaleState {
        match self {
            Direction::Apply => ScaleState::Scaled,
            Direction::Undo => ScaleState::Raw,
        }
    }

    /// `values` and `factor` must have the same shape.
    pub(crate) fn scale(self, values: &mut ArrayD<f64>, factor: &ArrayD<f64>) {
        match self {
            Direction::Apply => Zip::from(values).and(factor).for_each(|v, &f| *v /= f),
            Direction::Undo => Zip::from(values).and(factor).for_each(|v, &f| *v *= f),
        }
    }

    pub(crate) fn scale_value(self, value: f64, factor: f64) -> f64 {
        match self {
            Direction::Apply => value / factor,
            Direction::Undo => value * factor,
        }
    }

    pub(crate) fn scale_unit(self, unit: &DataUnit) -> DataUnit {
        match self {
            Direction::Apply => unit.per_second(),
            Direction::Undo => unit.times_second(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Apply(ScaleState),
    Skip,
}

/// Options of an exposure-time correction.
///
/// Deserializes from e.g. `{ "undo": true }`; missing fields default to
/// `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureCorrection {
    pub undo: bool,
    pub force: bool,
}

impl ExposureCorrection {
    pub const APPLY: Self = Self {
        undo: false,
        force: false,
    };
    pub const UNDO: Self = Self {
        undo: true,
        force: false,
    };

    pub fn forced(self) -> Self {
        Self {
            force: true,
            ..self
        }
    }

    pub fn direction(self) -> Direction {
        if self.undo {
            Direction::Undo
        } else {
            Direction::Apply
        }
    }
}

/// A validated correction, ready to be written into a cube.
#[derive(Debug)]
pub(crate) struct CorrectionPlan {
    pub direction: Direction,
    pub target: ScaleState,
    /// Exposure time of every sample, in seconds, shaped like the data.
    pub factor: ArrayD<f64>,
    /// Set when every slice has the same exposure time.
    pub uniform: Option<f64>,
}

/// Exposure times from `coords`, broadcast to `shape`.
///
/// Returns the broadcast factor and, if all exposures are equal, that value.
pub(crate) fn exposure_factor(
    coords: &ExtraCoords,
    shape: &[usize],
) -> Result<(ArrayD<f64>, Option<f64>)> {
    let coord = coords.require(EXPOSURE_TIME)?;
    let seconds = coord
        .values
        .as_seconds()
        .ok_or_else(|| Error::ExposureKind {
            name: EXPOSURE_TIME.to_string(),
        })?;

    if let Some(&value) = seconds.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(Error::InvalidExposure { value });
    }

    let ndim = shape.len();
    let mut factor_shape = vec![1; ndim];
    match (coord.axis, seconds.len()) {
        (Some(axis), _) if axis >= ndim => {
            return Err(Error::ExtraCoordAxis {
                name: EXPOSURE_TIME.to_string(),
                axis,
                ndim,
            });
        }
        (_, 1) => {}
        (Some(axis), len) if len == shape[axis] => factor_shape[axis] = len,
        (axis, len) => {
            return Err(Error::ExposureLength {
                name: EXPOSURE_TIME.to_string(),
                axis,
                len,
                expected: axis.map_or(1, |a| shape[a]),
            });
        }
    }

    let uniform = match seconds.first() {
        Some(&first) if seconds.iter().all(|&s| s == first) => Some(first),
        _ => None,
    };

    let shape_error = || Error::ShapeMismatch {
        what: "exposure time",
        expected: shape.to_vec(),
        found: factor_shape.clone(),
    };
    let factor = ArrayD::from_shape_vec(IxDyn(&factor_shape), seconds).map_err(|_| shape_error())?;
    let factor = factor
        .broadcast(IxDyn(shape))
        .ok_or_else(shape_error)?
        .to_owned();

    Ok((factor, uniform))
}
