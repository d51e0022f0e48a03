use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::{
    common::meta::{Meta, OBSID},
    coords::{ExtraCoord, ExtraCoords},
    cube::{correction::ExposureCorrection, MapCube},
    error::{Error, Result},
};

#[cfg(test)]
mod tests;

/// Cubes of one observation, conceptually stacked along `common_axis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMapCubeSequence")]
pub struct MapCubeSequence {
    /// Never empty.
    cubes: Vec<MapCube>,
    common_axis: usize,
    meta: Meta,
}

/// Serialized form of a [`MapCubeSequence`], checked by
/// [`MapCubeSequence::new`].
#[derive(Deserialize)]
struct RawMapCubeSequence {
    cubes: Vec<MapCube>,
    common_axis: usize,
    meta: Meta,
}

impl TryFrom<RawMapCubeSequence> for MapCubeSequence {
    type Error = Error;

    fn try_from(raw: RawMapCubeSequence) -> Result<Self> {
        MapCubeSequence::new(raw.cubes, raw.meta, raw.common_axis)
    }
}

/// `shape` without `axis`.
fn shape_outside(shape: &[usize], axis: usize) -> Vec<usize> {
    shape
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != axis)
        .map(|(_, &len)| len)
        .collect()
}

impl MapCubeSequence {
    /// Checks that all cubes have the same dimensionality, agree in shape
    /// outside `common_axis` and belong to the same observation.
    pub fn new(cubes: Vec<MapCube>, meta: Meta, common_axis: usize) -> Result<Self> {
        let first = cubes.first().ok_or(Error::EmptySequence)?;

        let ndim = first.ndim();
        if common_axis >= ndim {
            return Err(Error::CommonAxisOutOfRange {
                axis: common_axis,
                ndim,
            });
        }

        let expected = shape_outside(first.data().shape(), common_axis);
        for (index, cube) in cubes.iter().enumerate().skip(1) {
            if cube.ndim() != ndim {
                return Err(Error::MemberDimensionality {
                    index,
                    expected: ndim,
                    found: cube.ndim(),
                });
            }

            let found = shape_outside(cube.data().shape(), common_axis);
            if found != expected {
                return Err(Error::MemberShape {
                    index,
                    expected,
                    found,
                });
            }

            if cube.meta().obsid() != first.meta().obsid() {
                return Err(Error::InconsistentMeta { index, key: OBSID });
            }
        }

        Ok(Self {
            cubes,
            common_axis,
            meta,
        })
    }

    fn first(&self) -> &MapCube {
        &self.cubes[0]
    }

    pub fn cubes(&self) -> &[MapCube] {
        &self.cubes
    }

    pub fn into_cubes(self) -> Vec<MapCube> {
        self.cubes
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapCube> {
        self.cubes.iter()
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn common_axis(&self) -> usize {
        self.common_axis
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Length of the cubes along the common axis.
    fn common_axis_lens(&self) -> impl Iterator<Item = usize> + '_ {
        let axis = self.common_axis;
        self.cubes.iter().map(move |cube| cube.data().shape()[axis])
    }

    /// Shape of the sequence seen as one cube concatenated along the common
    /// axis.
    pub fn dimensions(&self) -> Vec<usize> {
        let mut dimensions = self.first().dimensions();
        dimensions[self.common_axis] = self.common_axis_lens().sum();
        dimensions
    }

    pub fn world_axis_physical_types(&self) -> Vec<String> {
        self.first().world_axis_physical_types()
    }

    /// Applies [`MapCube::apply_exposure_time_correction`] to every cube.
    ///
    /// All cubes are checked before any is changed, so if one of them fails
    /// the whole sequence is left as it was.
    #[instrument(skip(self), fields(cubes = self.cubes.len()))]
    pub fn apply_exposure_time_correction(
        &mut self,
        correction: ExposureCorrection,
    ) -> Result<&mut Self> {
        let plans = self
            .cubes
            .iter()
            .enumerate()
            .map(|(index, cube)| {
                trace!(index, "Checking exposure time correction");
                cube.plan_exposure_correction(correction)
            })
            .collect::<Result<Vec<_>>>()?;

        for (cube, plan) in self.cubes.iter_mut().zip(plans) {
            if let Some(plan) = plan {
                cube.commit_exposure_correction(plan);
            }
        }
        Ok(self)
    }

    /// A new sequence of corrected copies; `self` is left alone.
    #[instrument(skip(self), fields(cubes = self.cubes.len()))]
    pub fn exposure_time_corrected(&self, correction: ExposureCorrection) -> Result<Self> {
        let cubes = self
            .cubes
            .iter()
            .enumerate()
            .map(|(index, cube)| {
                trace!(index, "Correcting copy");
                cube.exposure_time_corrected(correction)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            cubes,
            common_axis: self.common_axis,
            meta: self.meta.clone(),
        })
    }

    /// Slice `index` along the common axis of the concatenated sequence.
    pub fn index_as_cube(&self, index: usize) -> Result<MapCube> {
        let mut local = index;
        for (cube, len) in self.cubes.iter().zip(self.common_axis_lens()) {
            if local < len {
                return cube.index_axis(self.common_axis, local);
            }
            local -= len;
        }
        Err(Error::IndexOutOfBounds {
            index,
            len: self.common_axis_lens().sum(),
        })
    }

    /// Extra coordinates along the common axis, joined across all cubes.
    ///
    /// Only coordinates the first cube has on the common axis are included.
    /// Every other cube must have them on the common axis as well.
    pub fn common_axis_extra_coords(&self) -> Result<ExtraCoords> {
        let mut out = ExtraCoords::new();
        for (name, coord) in self.first().extra_coords().iter() {
            if coord.axis != Some(self.common_axis) {
                continue;
            }

            let mut values = coord.values.clone();
            for cube in self.cubes.iter().skip(1) {
                let other = cube
                    .extra_coords()
                    .get(name)
                    .filter(|other| other.axis == Some(self.common_axis))
                    .ok_or_else(|| Error::MissingExtraCoord {
                        name: name.to_string(),
                    })?;
                if !values.extend_from(&other.values) {
                    return Err(Error::MixedCoordValues {
                        name: name.to_string(),
                    });
                }
            }
            out.insert(name, ExtraCoord::on_axis(self.common_axis, values));
        }
        Ok(out)
    }
}

impl Display for MapCubeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MapCubeSequence")?;
        if let Some(obsid) = self.meta.obsid() {
            writeln!(f, "  OBSID: {obsid:?}")?;
        }
        writeln!(f, "  Cubes: {}", self.cubes.len())?;
        writeln!(f, "  Common axis: {}", self.common_axis)?;
        writeln!(f, "  Dimensions: {:?} pix", self.dimensions())?;
        write!(
            f,
            "  Physical types of axes: {}",
            self.world_axis_physical_types().join(", ")
        )
    }
}
