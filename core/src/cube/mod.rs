use std::fmt::{self, Display};

use ndarray::{Array, ArrayD, Axis, Dimension};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    common::{meta::Meta, unit::DataUnit},
    coords::{ExtraCoord, ExtraCoords},
    error::{Error, Result},
    wcs::Wcs,
};

use self::correction::{
    exposure_factor, CorrectionPlan, ExposureCorrection, ScaleState, Transition,
};

pub mod correction;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Uncertainty {
    /// The same uncertainty for every sample.
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl Uncertainty {
    pub fn array<D: Dimension>(values: Array<f64, D>) -> Self {
        Uncertainty::Array(values.into_dyn())
    }
}

/// An N-dimensional image cube with coordinates, unit, mask, uncertainty and
/// its exposure-time correction state.
///
/// Array axes are in the reverse order of the (non-missing) WCS axes, so for
/// a slit-jaw image stack the data is `(time, y, x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMapCube")]
pub struct MapCube {
    data: ArrayD<f64>,
    wcs: Wcs,
    /// One flag per WCS axis, `true` for axes that are not part of `data`.
    missing_axes: Vec<bool>,
    unit: Option<DataUnit>,
    mask: Option<ArrayD<bool>>,
    /// Array uncertainties always have the shape of `data`.
    uncertainty: Option<Uncertainty>,
    extra_coords: ExtraCoords,
    meta: Meta,
    scaled: ScaleState,
}

/// Serialized form of a [`MapCube`], checked by [`MapCubeBuilder::build`]
/// before it becomes a cube.
#[derive(Deserialize)]
struct RawMapCube {
    data: ArrayD<f64>,
    wcs: Wcs,
    missing_axes: Vec<bool>,
    unit: Option<DataUnit>,
    mask: Option<ArrayD<bool>>,
    uncertainty: Option<Uncertainty>,
    extra_coords: ExtraCoords,
    meta: Meta,
    scaled: ScaleState,
}

impl TryFrom<RawMapCube> for MapCube {
    type Error = Error;

    fn try_from(raw: RawMapCube) -> Result<Self> {
        MapCubeBuilder {
            data: raw.data,
            wcs: raw.wcs,
            missing_axes: Some(raw.missing_axes),
            unit: raw.unit,
            mask: raw.mask,
            uncertainty: raw.uncertainty,
            extra_coords: raw.extra_coords,
            meta: raw.meta,
            scaled: raw.scaled,
        }
        .build()
    }
}

#[derive(Debug, Clone)]
pub struct MapCubeBuilder {
    data: ArrayD<f64>,
    wcs: Wcs,
    missing_axes: Option<Vec<bool>>,
    unit: Option<DataUnit>,
    mask: Option<ArrayD<bool>>,
    uncertainty: Option<Uncertainty>,
    extra_coords: ExtraCoords,
    meta: Meta,
    scaled: ScaleState,
}

impl MapCubeBuilder {
    pub fn uncertainty(mut self, uncertainty: Uncertainty) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn mask<D: Dimension>(mut self, mask: Array<bool, D>) -> Self {
        self.mask = Some(mask.into_dyn());
        self
    }

    pub fn unit(mut self, unit: DataUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn extra_coord(mut self, name: impl Into<String>, coord: ExtraCoord) -> Self {
        self.extra_coords.insert(name, coord);
        self
    }

    pub fn extra_coords(mut self, extra_coords: ExtraCoords) -> Self {
        self.extra_coords = extra_coords;
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn scaled(mut self, scaled: impl Into<ScaleState>) -> Self {
        self.scaled = scaled.into();
        self
    }

    /// Flags in WCS order, `true` for axes that have been sliced away.
    pub fn missing_axes(mut self, missing_axes: Vec<bool>) -> Self {
        self.missing_axes = Some(missing_axes);
        self
    }

    pub fn build(self) -> Result<MapCube> {
        let naxis = self.wcs.naxis();
        let missing_axes = self.missing_axes.unwrap_or_else(|| vec![false; naxis]);
        if missing_axes.len() != naxis {
            return Err(Error::MissingAxesLength {
                naxis,
                missing: missing_axes.len(),
            });
        }

        let present = missing_axes.iter().filter(|m| !**m).count();
        if present != self.data.ndim() {
            return Err(Error::AxisCountMismatch {
                present,
                ndim: self.data.ndim(),
            });
        }

        if let Some(mask) = &self.mask {
            if mask.shape() != self.data.shape() {
                return Err(Error::ShapeMismatch {
                    what: "mask",
                    expected: self.data.shape().to_vec(),
                    found: mask.shape().to_vec(),
                });
            }
        }

        let uncertainty = match self.uncertainty {
            Some(Uncertainty::Array(values)) => {
                let values = values
                    .broadcast(self.data.raw_dim())
                    .ok_or_else(|| Error::ShapeMismatch {
                        what: "uncertainty",
                        expected: self.data.shape().to_vec(),
                        found: values.shape().to_vec(),
                    })?
                    .to_owned();
                Some(Uncertainty::Array(values))
            }
            other => other,
        };

        Ok(MapCube {
            data: self.data,
            wcs: self.wcs,
            missing_axes,
            unit: self.unit,
            mask: self.mask,
            uncertainty,
            extra_coords: self.extra_coords,
            meta: self.meta,
            scaled: self.scaled,
        })
    }
}

impl MapCube {
    pub fn builder<D: Dimension>(data: Array<f64, D>, wcs: Wcs) -> MapCubeBuilder {
        MapCubeBuilder {
            data: data.into_dyn(),
            wcs,
            missing_axes: None,
            unit: None,
            mask: None,
            uncertainty: None,
            extra_coords: ExtraCoords::new(),
            meta: Meta::new(),
            scaled: ScaleState::default(),
        }
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn wcs(&self) -> &Wcs {
        &self.wcs
    }

    pub fn missing_axes(&self) -> &[bool] {
        &self.missing_axes
    }

    pub fn unit(&self) -> Option<&DataUnit> {
        self.unit.as_ref()
    }

    pub fn mask(&self) -> Option<&ArrayD<bool>> {
        self.mask.as_ref()
    }

    pub fn uncertainty(&self) -> Option<&Uncertainty> {
        self.uncertainty.as_ref()
    }

    pub fn extra_coords(&self) -> &ExtraCoords {
        &self.extra_coords
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn scaled(&self) -> ScaleState {
        self.scaled
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn dimensions(&self) -> Vec<usize> {
        self.data.shape().to_vec()
    }

    /// WCS axis index of each array axis.
    fn wcs_axes(&self) -> Vec<usize> {
        let mut axes: Vec<_> = self
            .missing_axes
            .iter()
            .enumerate()
            .filter(|(_, missing)| !**missing)
            .map(|(i, _)| i)
            .collect();
        axes.reverse();
        axes
    }

    /// Physical type of each array axis, in array order.
    pub fn world_axis_physical_types(&self) -> Vec<String> {
        self.wcs_axes()
            .into_iter()
            .filter_map(|i| self.wcs.axis(i))
            .map(|axis| axis.physical_type())
            .collect()
    }

    /// Checks the preconditions of a correction and works out what it would
    /// do, without touching the cube. `None` means the correction is skipped.
    pub(crate) fn plan_exposure_correction(
        &self,
        correction: ExposureCorrection,
    ) -> Result<Option<CorrectionPlan>> {
        let ndim = self.ndim();
        if !(2..=3).contains(&ndim) {
            return Err(Error::UnsupportedDimensionality { ndim });
        }

        let (factor, uniform) = exposure_factor(&self.extra_coords, self.data.shape())?;

        let direction = correction.direction();
        match self.scaled.transition(direction, correction.force) {
            Transition::Skip => {
                debug!(state = ?self.scaled, ?direction, "Exposure time correction already in place, skipping");
                Ok(None)
            }
            Transition::Apply(target) => Ok(Some(CorrectionPlan {
                direction,
                target,
                factor,
                uniform,
            })),
        }
    }

    pub(crate) fn commit_exposure_correction(&mut self, plan: CorrectionPlan) {
        let direction = plan.direction;
        direction.scale(&mut self.data, &plan.factor);

        self.uncertainty = match self.uncertainty.take() {
            Some(Uncertainty::Scalar(value)) => Some(match plan.uniform {
                Some(exposure) => Uncertainty::Scalar(direction.scale_value(value, exposure)),
                None => {
                    let mut values = ArrayD::from_elem(self.data.raw_dim(), value);
                    direction.scale(&mut values, &plan.factor);
                    Uncertainty::Array(values)
                }
            }),
            Some(Uncertainty::Array(mut values)) => {
                direction.scale(&mut values, &plan.factor);
                Some(Uncertainty::Array(values))
            }
            None => None,
        };

        self.unit = self.unit.as_ref().map(|unit| direction.scale_unit(unit));

        debug!(from = ?self.scaled, to = ?plan.target, ?direction, "Applied exposure time correction");
        self.scaled = plan.target;
    }

    /// Divides the data and uncertainty by the exposure time of each slice
    /// (or multiplies, when undoing), in place.
    ///
    /// Returns the same cube. Nothing is changed if the cube is already in
    /// the requested state (unless forced) or a precondition fails.
    #[instrument(skip(self), fields(shape = ?self.data.shape(), scaled = ?self.scaled))]
    pub fn apply_exposure_time_correction(
        &mut self,
        correction: ExposureCorrection,
    ) -> Result<&mut Self> {
        if let Some(plan) = self.plan_exposure_correction(correction)? {
            self.commit_exposure_correction(plan);
        }
        Ok(self)
    }

    /// Like [`apply_exposure_time_correction`](Self::apply_exposure_time_correction),
    /// but returns a corrected copy and leaves `self` alone.
    #[instrument(skip(self), fields(shape = ?self.data.shape(), scaled = ?self.scaled))]
    pub fn exposure_time_corrected(&self, correction: ExposureCorrection) -> Result<MapCube> {
        let plan = self.plan_exposure_correction(correction)?;
        let mut cube = self.clone();
        if let Some(plan) = plan {
            cube.commit_exposure_correction(plan);
        }
        Ok(cube)
    }

    /// The cube with array axis `axis` fixed at `index`.
    ///
    /// The matching WCS axis is marked missing and extra coordinates of that
    /// axis become scalars.
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<MapCube> {
        let ndim = self.ndim();
        if axis >= ndim {
            return Err(Error::AxisOutOfRange { axis, ndim });
        }
        let len = self.data.len_of(Axis(axis));
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }

        let mut missing_axes = self.missing_axes.clone();
        if let Some(&wcs_axis) = self.wcs_axes().get(axis) {
            missing_axes[wcs_axis] = true;
        }

        let uncertainty = self.uncertainty.as_ref().map(|u| match u {
            Uncertainty::Scalar(value) => Uncertainty::Scalar(*value),
            Uncertainty::Array(values) => {
                Uncertainty::Array(values.index_axis(Axis(axis), index).to_owned())
            }
        });

        Ok(MapCube {
            data: self.data.index_axis(Axis(axis), index).to_owned(),
            wcs: self.wcs.clone(),
            missing_axes,
            unit: self.unit.clone(),
            mask: self
                .mask
                .as_ref()
                .map(|mask| mask.index_axis(Axis(axis), index).to_owned()),
            uncertainty,
            extra_coords: self.extra_coords.index_axis(axis, index),
            meta: self.meta.clone(),
            scaled: self.scaled,
        })
    }
}

impl Display for MapCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MapCube")?;
        writeln!(f, "  Dimensions: {:?} pix", self.data.shape())?;
        writeln!(
            f,
            "  Physical types of axes: {}",
            self.world_axis_physical_types().join(", ")
        )?;
        match &self.unit {
            Some(unit) => writeln!(f, "  Unit: {unit}")?,
            None => writeln!(f, "  Unit: None")?,
        }
        if let Some(obsid) = self.meta.obsid() {
            writeln!(f, "  OBSID: {obsid:?}")?;
        }
        write!(f, "  Exposure time corrected: {}", self.scaled.is_scaled())
    }
}
